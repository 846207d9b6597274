//! The job table: a fixed-capacity registry of active process groups.
//!
//! Owned exclusively by the worker thread. The signal relay never
//! touches it directly; its notifications arrive as messages the
//! worker applies one at a time, so no two mutations can interleave.

use std::io;

use thiserror::Error;

pub use nix::unistd::Pid;

/// Maximum number of concurrently tracked jobs.
pub const MAX_JOBS: usize = 16;

/// Stored command lines are clipped to this many bytes.
pub const MAX_CMDLINE: usize = 1024;

pub type JobId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl JobState {
    pub fn label(self) -> &'static str {
        match self {
            JobState::Foreground => "Foreground",
            JobState::Background => "Running",
            JobState::Stopped => "Stopped",
        }
    }
}

/// One process group launched by the shell.
#[derive(Debug, Clone)]
pub struct Job {
    pub pgid: Pid,
    pub jid: JobId,
    pub state: JobState,
    pub cmdline: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobTableError {
    #[error("too many jobs")]
    Full,
    #[error("invalid process group {0}")]
    BadPgid(i32),
}

#[derive(Debug)]
pub struct JobTable {
    slots: [Option<Job>; MAX_JOBS],
    next_jid: JobId,
    verbose: bool,
}

impl JobTable {
    pub fn new(verbose: bool) -> Self {
        JobTable {
            slots: std::array::from_fn(|_| None),
            next_jid: 1,
            verbose,
        }
    }

    /// Occupies the first free slot and assigns the next job id.
    pub fn add(
        &mut self,
        pgid: Pid,
        state: JobState,
        cmdline: &str,
    ) -> Result<JobId, JobTableError> {
        if pgid.as_raw() <= 0 {
            return Err(JobTableError::BadPgid(pgid.as_raw()));
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(JobTableError::Full)?;

        if self.next_jid > MAX_JOBS {
            self.next_jid = 1;
        }
        let jid = self.next_jid;
        self.next_jid += 1;

        let cmdline = clip(cmdline);
        if self.verbose {
            println!("Added job [{jid}] {pgid} {cmdline}");
        }
        *slot = Some(Job {
            pgid,
            jid,
            state,
            cmdline,
        });
        Ok(jid)
    }

    /// Clears the slot holding `pgid` and resets the id allocator to
    /// one past the largest live job id. Returns whether a match
    /// existed.
    pub fn remove(&mut self, pgid: Pid) -> bool {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|j| j.pgid == pgid) {
                *slot = None;
                self.next_jid = self.max_jid() + 1;
                return true;
            }
        }
        false
    }

    pub fn find_by_pgid(&self, pgid: Pid) -> Option<&Job> {
        self.iter().find(|j| j.pgid == pgid)
    }

    pub fn find_by_jid(&self, jid: JobId) -> Option<&Job> {
        self.iter().find(|j| j.jid == jid)
    }

    /// The unique foreground job's group id, if any.
    pub fn foreground_pgid(&self) -> Option<Pid> {
        self.iter()
            .find(|j| j.state == JobState::Foreground)
            .map(|j| j.pgid)
    }

    /// Transitions the job holding `pgid`. Every transition is driven
    /// off a pgid the caller just looked up, so a miss is a caller bug.
    pub fn set_state(&mut self, pgid: Pid, state: JobState) {
        let job = self
            .slots
            .iter_mut()
            .flatten()
            .find(|j| j.pgid == pgid)
            .unwrap_or_else(|| panic!("no job for process group {pgid}"));
        job.state = state;
    }

    /// Writes one line per live job, in slot order.
    pub fn list(&self, sink: &mut impl io::Write) -> io::Result<()> {
        for job in self.iter() {
            writeln!(
                sink,
                "[{}] ({}) {} {}",
                job.jid,
                job.pgid,
                job.state.label(),
                job.cmdline
            )?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().flatten()
    }

    fn max_jid(&self) -> JobId {
        self.iter().map(|j| j.jid).max().unwrap_or(0)
    }
}

fn clip(cmdline: &str) -> String {
    let mut end = cmdline.len().min(MAX_CMDLINE);
    while !cmdline.is_char_boundary(end) {
        end -= 1;
    }
    cmdline[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    fn table() -> JobTable {
        JobTable::new(false)
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let mut jobs = table();
        assert_eq!(jobs.add(pid(100), JobState::Background, "a &"), Ok(1));
        assert_eq!(jobs.add(pid(200), JobState::Background, "b &"), Ok(2));
        assert_eq!(jobs.find_by_jid(2).unwrap().pgid, pid(200));
        assert_eq!(jobs.find_by_pgid(pid(100)).unwrap().jid, 1);
    }

    #[test]
    fn add_rejects_nonpositive_pgid() {
        let mut jobs = table();
        assert_eq!(
            jobs.add(pid(0), JobState::Background, "x"),
            Err(JobTableError::BadPgid(0))
        );
        assert_eq!(jobs.iter().count(), 0);
    }

    #[test]
    fn add_into_a_full_table_fails_and_changes_nothing() {
        let mut jobs = table();
        for n in 1..=MAX_JOBS as i32 {
            jobs.add(pid(n * 10), JobState::Background, "job").unwrap();
        }
        assert_eq!(
            jobs.add(pid(999), JobState::Background, "one too many"),
            Err(JobTableError::Full)
        );
        assert_eq!(jobs.iter().count(), MAX_JOBS);
        assert!(jobs.find_by_pgid(pid(999)).is_none());
    }

    #[test]
    fn remove_of_an_absent_pgid_is_not_found() {
        let mut jobs = table();
        jobs.add(pid(100), JobState::Background, "a").unwrap();
        assert!(!jobs.remove(pid(200)));
        assert_eq!(jobs.iter().count(), 1);
    }

    #[test]
    fn remove_resets_the_id_watermark() {
        let mut jobs = table();
        jobs.add(pid(100), JobState::Background, "a").unwrap();
        jobs.add(pid(200), JobState::Background, "b").unwrap();
        jobs.add(pid(300), JobState::Background, "c").unwrap();
        assert!(jobs.remove(pid(300)));
        assert_eq!(jobs.add(pid(400), JobState::Background, "d"), Ok(3));
    }

    #[test]
    fn job_ids_wrap_past_capacity() {
        let mut jobs = table();
        for n in 1..=MAX_JOBS as i32 {
            jobs.add(pid(n * 10), JobState::Background, "job").unwrap();
        }
        // freeing the lowest id leaves the watermark above capacity
        assert!(jobs.remove(pid(10)));
        assert_eq!(jobs.add(pid(999), JobState::Background, "wrap"), Ok(1));
    }

    #[test]
    fn at_most_one_foreground_job() {
        let mut jobs = table();
        jobs.add(pid(100), JobState::Foreground, "fg one").unwrap();
        jobs.add(pid(200), JobState::Background, "bg one &").unwrap();
        assert_eq!(jobs.foreground_pgid(), Some(pid(100)));

        jobs.set_state(pid(100), JobState::Stopped);
        assert_eq!(jobs.foreground_pgid(), None);

        jobs.set_state(pid(200), JobState::Foreground);
        assert_eq!(jobs.foreground_pgid(), Some(pid(200)));
        assert_eq!(
            jobs.iter()
                .filter(|j| j.state == JobState::Foreground)
                .count(),
            1
        );
    }

    #[test]
    fn stopped_jobs_stay_registered_until_removed() {
        let mut jobs = table();
        jobs.add(pid(100), JobState::Foreground, "vi notes").unwrap();
        jobs.set_state(pid(100), JobState::Stopped);
        assert!(jobs.find_by_pgid(pid(100)).is_some());
        assert!(jobs.remove(pid(100)));
        assert!(jobs.find_by_pgid(pid(100)).is_none());
    }

    #[test]
    #[should_panic(expected = "no job for process group")]
    fn set_state_on_an_unknown_pgid_is_a_caller_bug() {
        let mut jobs = table();
        jobs.set_state(pid(4242), JobState::Stopped);
    }

    #[test]
    fn list_writes_one_line_per_job_in_slot_order() {
        let mut jobs = table();
        jobs.add(pid(100), JobState::Background, "sleep 100 &").unwrap();
        jobs.add(pid(200), JobState::Stopped, "vi notes").unwrap();
        jobs.add(pid(300), JobState::Foreground, "make").unwrap();

        let mut out = Vec::new();
        jobs.list(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[1] (100) Running sleep 100 &\n\
             [2] (200) Stopped vi notes\n\
             [3] (300) Foreground make\n"
        );
    }

    #[test]
    fn list_order_follows_slots_not_ids() {
        let mut jobs = table();
        jobs.add(pid(100), JobState::Background, "a &").unwrap();
        jobs.add(pid(200), JobState::Background, "b &").unwrap();
        jobs.add(pid(300), JobState::Background, "c &").unwrap();
        // the freed middle slot is reused by the next add, which
        // nevertheless gets a fresh id
        assert!(jobs.remove(pid(200)));
        jobs.add(pid(400), JobState::Background, "d &").unwrap();

        let mut out = Vec::new();
        jobs.list(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[1] (100) Running a &\n\
             [4] (400) Running d &\n\
             [3] (300) Running c &\n"
        );
    }

    #[test]
    fn command_lines_are_clipped() {
        let mut jobs = table();
        let long = "x".repeat(MAX_CMDLINE * 2);
        jobs.add(pid(100), JobState::Background, &long).unwrap();
        assert_eq!(
            jobs.find_by_pgid(pid(100)).unwrap().cmdline.len(),
            MAX_CMDLINE
        );
    }
}
