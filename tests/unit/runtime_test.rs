//! Tests for the workload simulation

use std::time::Duration;

use prometheus_admission::core::AdmissionController;
use prometheus_admission::runtime::{demo_jobs, run_simulation, SimJob, SimPhase, SleepWork};
use prometheus_admission::util::{Priority, ResourceAmounts};

#[test]
fn test_demo_jobs_shape() {
    let jobs = demo_jobs();
    let priorities: Vec<_> = jobs.iter().map(|j| j.priority).collect();
    assert_eq!(
        priorities,
        vec![
            Priority::Low,
            Priority::High,
            Priority::Low,
            Priority::High,
            Priority::Low
        ]
    );
    assert!(jobs.iter().all(|j| j.amounts == ResourceAmounts::uniform(1)));
    assert_eq!(jobs[0].name, "Task1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_simulation_runs_every_job_to_completion() {
    let controller = AdmissionController::new(2, 2, 2).unwrap();
    let timeline = run_simulation(&controller, demo_jobs(), SleepWork::new(Duration::from_millis(5)))
        .await
        .unwrap();

    for phase in [SimPhase::Requested, SimPhase::Granted, SimPhase::Released] {
        assert_eq!(timeline.iter().filter(|e| e.phase == phase).count(), 5);
    }
    // Never more than two jobs between Granted and Released.
    let mut running = 0i32;
    for event in &timeline {
        match event.phase {
            SimPhase::Granted => running += 1,
            SimPhase::Released => running -= 1,
            _ => {}
        }
        assert!(running <= 2);
    }
    assert_eq!(controller.snapshot().available(), ResourceAmounts::uniform(2));
}

#[tokio::test]
async fn test_simulation_records_rejection() {
    let controller = AdmissionController::new(1, 1, 1).unwrap();
    let jobs = vec![
        SimJob::new("fits", ResourceAmounts::uniform(1), Priority::Low),
        SimJob::new("too-big", ResourceAmounts::new(1, 3, 1), Priority::High),
    ];
    let timeline = run_simulation(&controller, jobs, SleepWork::new(Duration::from_millis(1)))
        .await
        .unwrap();

    let rejected: Vec<_> = timeline
        .iter()
        .filter(|e| e.phase == SimPhase::Rejected)
        .map(|e| e.job.as_str())
        .collect();
    assert_eq!(rejected, vec!["too-big"]);
    assert!(timeline
        .iter()
        .any(|e| e.job == "fits" && e.phase == SimPhase::Released));
}
