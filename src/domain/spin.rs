use rand::Rng;

use super::Cents;

/// Which wheel a spin uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinKind {
    /// Once per calendar day, small prizes
    Free,
    /// Paid spin with bigger prizes
    Bought,
}

/// Prize segments for the daily free spin (1 to 2 Rs).
pub const FREE_SEGMENTS: [Cents; 8] = [100, 200, 150, 100, 200, 120, 100, 180];

/// Prize segments for a bought spin (3 to 10 Rs).
pub const BOUGHT_SEGMENTS: [Cents; 8] = [500, 700, 900, 1000, 300, 500, 700, 400];

pub const SPIN_PRIZE_DESCRIPTION: &str = "Spin Wheel Prize";

impl SpinKind {
    pub fn segments(&self) -> &'static [Cents] {
        match self {
            SpinKind::Free => &FREE_SEGMENTS,
            SpinKind::Bought => &BOUGHT_SEGMENTS,
        }
    }

    /// Pick a segment uniformly; the winner is decided before any animation.
    pub fn spin<R: Rng + ?Sized>(&self, rng: &mut R) -> SpinOutcome {
        let segments = self.segments();
        let index = rng.gen_range(0..segments.len());
        SpinOutcome {
            kind: *self,
            segment: index,
            prize: segments[index],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinOutcome {
    pub kind: SpinKind,
    pub segment: usize,
    pub prize: Cents,
}
