use serde::Serialize;

/// A listing on the job board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub kind: &'static str,
    pub salary: &'static str,
    /// Hidden from Starter subscribers
    pub is_premium: bool,
}

pub static JOB_BOARD: [Job; 3] = [
    Job {
        id: "job1",
        title: "Data Entry Clerk",
        description: "Enter data from various sources into our database.",
        kind: "Part-time",
        salary: "15,000 Rs/month",
        is_premium: false,
    },
    Job {
        id: "job2",
        title: "Virtual Assistant",
        description: "Provide administrative, technical, or creative assistance to clients remotely.",
        kind: "Full-time",
        salary: "30,000 Rs/month",
        is_premium: true,
    },
    Job {
        id: "job3",
        title: "Social Media Manager",
        description: "Manage and grow our social media presence.",
        kind: "Contract",
        salary: "25,000 Rs/month",
        is_premium: true,
    },
];

pub fn find_job(id: &str) -> Option<&'static Job> {
    JOB_BOARD.iter().find(|job| job.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_job() {
        assert_eq!(find_job("job2").map(|j| j.title), Some("Virtual Assistant"));
        assert!(find_job("job9").is_none());
    }
}
