//! End-to-end checks of the parsing and job-tracking surface: each
//! case walks the table through the transitions the dispatcher and
//! reaper would drive for it.

use tinysh::shell::worker::job::{JobState, JobTable, Pid};
use tinysh::shell::worker::parse::{parse_line, Builtin, ParseError};

#[test]
fn background_submission_returns_to_the_prompt_with_a_status_line() {
    // "sleep 5 &": parsed as a background job, registered as Running
    let line = "sleep 5 &";
    let cmd = parse_line(line).unwrap().unwrap();
    assert!(cmd.background);
    assert_eq!(cmd.argv, vec!["sleep", "5"]);

    let mut jobs = JobTable::new(false);
    let jid = jobs.add(Pid::from_raw(3100), JobState::Background, line).unwrap();
    assert_eq!(jid, 1);

    let mut out = Vec::new();
    jobs.list(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "[1] (3100) Running sleep 5 &\n"
    );
}

#[test]
fn foreground_job_is_removed_silently_when_it_exits() {
    let cmd = parse_line("echo hi").unwrap().unwrap();
    assert!(!cmd.background);

    let mut jobs = JobTable::new(false);
    let pgid = Pid::from_raw(3200);
    jobs.add(pgid, JobState::Foreground, "echo hi").unwrap();
    assert_eq!(jobs.foreground_pgid(), Some(pgid));

    // the reaper's exit path
    assert!(jobs.remove(pgid));
    assert_eq!(jobs.foreground_pgid(), None);
    assert_eq!(jobs.iter().count(), 0);
}

#[test]
fn stopped_foreground_job_stays_registered() {
    let mut jobs = JobTable::new(false);
    let pgid = Pid::from_raw(3300);
    jobs.add(pgid, JobState::Foreground, "sleep 100").unwrap();

    // the reaper's stop path
    jobs.set_state(pgid, JobState::Stopped);
    assert_eq!(jobs.foreground_pgid(), None);
    let job = jobs.find_by_pgid(pgid).unwrap();
    assert_eq!(job.state, JobState::Stopped);
    assert_eq!(job.jid, 1);
}

#[test]
fn fg_on_a_stopped_job_resumes_it_in_the_foreground() {
    let mut jobs = JobTable::new(false);
    let pgid = Pid::from_raw(3400);
    jobs.add(pgid, JobState::Foreground, "sleep 100").unwrap();
    jobs.set_state(pgid, JobState::Stopped);

    // "fg %1": the dispatcher resolves the job id and transitions it
    let cmd = parse_line("fg %1").unwrap().unwrap();
    assert_eq!(cmd.builtin, Builtin::Fg);
    let target = cmd.argv[1].strip_prefix('%').unwrap().parse().unwrap();
    let resolved = jobs.find_by_jid(target).unwrap().pgid;
    assert_eq!(resolved, pgid);

    jobs.set_state(resolved, JobState::Foreground);
    assert_eq!(jobs.foreground_pgid(), Some(pgid));
}

#[test]
fn malformed_redirection_spawns_nothing() {
    assert_eq!(parse_line("cat < "), Err(ParseError::MissingRedirectTarget));
}

#[test]
fn jobs_with_output_redirection_parses_to_a_sink() {
    let cmd = parse_line("jobs > status.txt").unwrap().unwrap();
    assert_eq!(cmd.builtin, Builtin::Jobs);
    assert_eq!(cmd.outfile.as_deref(), Some("status.txt"));
}

#[test]
fn quoting_survives_the_trip_into_the_table() {
    let line = "echo 'hello   world' &";
    let cmd = parse_line(line).unwrap().unwrap();
    assert_eq!(cmd.argv, vec!["echo", "hello   world"]);

    let mut jobs = JobTable::new(false);
    jobs.add(Pid::from_raw(3500), JobState::Background, line).unwrap();
    assert_eq!(
        jobs.find_by_pgid(Pid::from_raw(3500)).unwrap().cmdline,
        line
    );
}
