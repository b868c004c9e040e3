use tokio::process::Command;

use crate::nodes::expand_node_list;

/// Field order requested from squeue: nodes, partition, elapsed, state.
const SQUEUE_FORMAT: &str = "%N\t%P\t%M\t%T";

/// Errors from the job-status provider.
#[derive(Debug)]
pub enum SlurmError {
    /// squeue itself could not be executed.
    QueueUnavailable(std::io::Error),
    /// squeue ran but knows no such job.
    JobNotFound,
    /// squeue produced output we cannot parse.
    MalformedOutput(String),
}

impl std::fmt::Display for SlurmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlurmError::QueueUnavailable(err) => write!(f, "failed to run squeue: {err}"),
            SlurmError::JobNotFound => write!(f, "job not found"),
            SlurmError::MalformedOutput(line) => write!(f, "unparseable squeue output: {line:?}"),
        }
    }
}

impl std::error::Error for SlurmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SlurmError::QueueUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

/// Scheduler states spyglass distinguishes; anything else passes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Other(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PENDING" => JobStatus::Pending,
            "RUNNING" => JobStatus::Running,
            "COMPLETE" | "COMPLETED" => JobStatus::Complete,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Complete => "COMPLETE",
            JobStatus::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a job's scheduler state.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub id: String,
    pub status: JobStatus,
    pub partition: String,
    pub elapsed: String,
    /// Allocated hosts in scheduler order, index-stable for the life of a
    /// monitoring session.
    pub nodes: Vec<String>,
}

/// Query the scheduler for `job_id`.
pub async fn query_job(job_id: &str) -> Result<JobSummary, SlurmError> {
    let output = Command::new("squeue")
        .args(["-a", "-h", "-o", SQUEUE_FORMAT, "-j", job_id])
        .output()
        .await
        .map_err(SlurmError::QueueUnavailable)?;

    // squeue complains about unknown ids on stderr and prints nothing on
    // stdout; both spell "no such job".
    if !output.stderr.is_empty() {
        log::debug!(
            "squeue stderr for job {job_id}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Err(SlurmError::JobNotFound);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().unwrap_or("").trim_end();
    if line.is_empty() {
        return Err(SlurmError::JobNotFound);
    }

    parse_squeue_line(job_id, line)
}

/// Parse one squeue output line in [`SQUEUE_FORMAT`] field order.
pub fn parse_squeue_line(job_id: &str, line: &str) -> Result<JobSummary, SlurmError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 4 {
        return Err(SlurmError::MalformedOutput(line.to_string()));
    }

    Ok(JobSummary {
        id: job_id.to_string(),
        status: JobStatus::parse(fields[3]),
        partition: fields[1].to_string(),
        elapsed: fields[2].to_string(),
        nodes: expand_node_list(fields[0])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_running_job() {
        let summary =
            parse_squeue_line("1234", "node[01-02]\tbatch\t1:23:45\tRUNNING").unwrap();
        assert_eq!(summary.id, "1234");
        assert_eq!(summary.status, JobStatus::Running);
        assert_eq!(summary.partition, "batch");
        assert_eq!(summary.elapsed, "1:23:45");
        assert_eq!(summary.nodes, vec!["node01", "node02"]);
    }

    #[test]
    fn test_parse_pending_job_has_no_nodes() {
        // %N is empty until the scheduler allocates hosts.
        let summary = parse_squeue_line("99", "\tdebug\t0:00\tPENDING").unwrap();
        assert_eq!(summary.status, JobStatus::Pending);
        assert!(summary.nodes.is_empty());
    }

    #[test]
    fn test_parse_unknown_state_passes_through() {
        let summary = parse_squeue_line("7", "n1\tbatch\t0:10\tCOMPLETING").unwrap();
        assert_eq!(summary.status, JobStatus::Other("COMPLETING".to_string()));
        assert_eq!(summary.status.as_str(), "COMPLETING");
    }

    #[test]
    fn test_parse_short_line_is_malformed() {
        assert!(matches!(
            parse_squeue_line("7", "n1\tbatch"),
            Err(SlurmError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(JobStatus::Running.to_string(), "RUNNING");
        assert_eq!(JobStatus::parse("FAILED").to_string(), "FAILED");
    }
}
