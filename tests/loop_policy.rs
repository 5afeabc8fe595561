//! Session-driver policy: trace shape, repetition thresholds, step
//! budget, fault handling and resource release.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{FakePage, ScriptedEngine, button, link, test_config};
use webpilot::browser::Page;
use webpilot::driver::{Session, SessionDriver, SessionState};
use webpilot::types::{StepStatus, TaskReport};

async fn run<I, S>(
    page: &Arc<FakePage>,
    directives: I,
    max_steps: usize,
) -> (TaskReport, SessionState)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let driver = SessionDriver::new(test_config(), ScriptedEngine::new(directives));
    let dyn_page: Arc<dyn Page> = page.clone();
    let mut session: Session = driver
        .start_session(dyn_page, "https://example.com")
        .await
        .expect("session should start");
    let report = driver.run_task(&mut session, "find the pricing link", max_steps).await;
    let state = session.state();
    session.close();
    (report, state)
}

#[tokio::test]
async fn trace_is_one_initial_record_plus_one_per_step() {
    let page = FakePage::new();
    let (report, _) = run(&page, ["SCROLL", "TASK_COMPLETE"], 5).await;

    assert_eq!(report.steps.len(), 3);
    assert_eq!(report.total_steps, 2);
    assert_eq!(report.steps[0].step_number, 0);
    assert_eq!(report.steps[0].message, "Session initialized");
    assert_eq!(report.steps[1].step_number, 1);
    assert_eq!(report.steps[2].step_number, 2);
}

#[tokio::test]
async fn task_complete_ends_the_loop() {
    let page = FakePage::new();
    let (report, state) = run(&page, ["TASK_COMPLETE"], 5).await;

    assert_eq!(report.final_status, StepStatus::Complete);
    assert_eq!(state, SessionState::Complete);
    assert_eq!(report.steps[1].message, "Task completed successfully");
    assert_eq!(report.total_steps, 1);
}

#[tokio::test]
async fn task_failed_ends_the_loop() {
    let page = FakePage::new();
    let (report, state) = run(&page, ["TASK_FAILED"], 5).await;

    assert_eq!(report.final_status, StepStatus::Failed);
    assert_eq!(state, SessionState::Failed);
}

#[tokio::test]
async fn three_identical_directives_force_completion() {
    let page = FakePage::new();
    page.set_elements("button", vec![button("Go")]);
    let directive = "CLICK button 'Go'";
    let (report, state) = run(&page, [directive, directive, directive], 5).await;

    assert_eq!(report.final_status, StepStatus::Complete);
    assert_eq!(state, SessionState::Complete);
    assert_eq!(report.total_steps, 3);
    assert_eq!(
        report.steps[3].message,
        "Stopping due to repeated actions"
    );
    // The third occurrence is a policy termination, not a click.
    assert_eq!(page.clicks().len(), 2);
}

#[tokio::test]
async fn two_identical_directives_do_not_terminate() {
    let page = FakePage::new();
    page.set_elements("button", vec![button("Go")]);
    let (report, _) = run(
        &page,
        ["CLICK button 'Go'", "CLICK button 'Go'", "TASK_COMPLETE"],
        5,
    )
    .await;

    assert_eq!(report.final_status, StepStatus::Complete);
    assert!(
        report
            .steps
            .iter()
            .all(|step| step.message != "Stopping due to repeated actions")
    );
    assert_eq!(page.clicks().len(), 2);
}

#[tokio::test]
async fn scrolling_gets_a_higher_repetition_allowance() {
    let page = FakePage::new();
    let (report, state) = run(&page, ["SCROLL", "SCROLL", "SCROLL", "SCROLL"], 6).await;

    assert_eq!(report.final_status, StepStatus::Complete);
    assert_eq!(state, SessionState::Complete);
    assert_eq!(report.total_steps, 4);
    assert_eq!(report.steps[4].message, "Finished exploring page content");
    assert_eq!(page.scrolls().len(), 3);
}

#[tokio::test]
async fn three_scrolls_do_not_terminate() {
    let page = FakePage::new();
    let (report, _) = run(&page, ["SCROLL", "SCROLL", "SCROLL", "TASK_COMPLETE"], 6).await;

    assert_eq!(report.final_status, StepStatus::Complete);
    assert_eq!(report.steps[4].message, "Task completed successfully");
    assert_eq!(page.scrolls().len(), 3);
}

#[tokio::test]
async fn step_budget_bounds_the_loop() {
    let page = FakePage::new();
    // The engine falls back to SCROLL forever; the budget must stop it.
    let (report, state) = run(&page, Vec::<String>::new(), 3).await;

    assert_eq!(report.final_status, StepStatus::Continue);
    assert_eq!(state, SessionState::StepLimitReached);
    assert_eq!(report.steps.len(), 4);
    assert_eq!(report.total_steps, 3);
}

#[tokio::test]
async fn executor_fault_becomes_a_terminal_error_record() {
    let page = FakePage::new();
    page.set_elements("button", vec![button("Go")]);
    page.fail_clicks();
    let (report, state) = run(&page, ["CLICK button 'Go'"], 5).await;

    assert_eq!(report.final_status, StepStatus::Error);
    assert_eq!(state, SessionState::Error);
    assert!(report.steps[1].message.starts_with("Click failed"));
}

#[tokio::test]
async fn introspection_fault_is_caught_at_the_driver() {
    let page = FakePage::new();
    page.fail_visible_text();
    let (report, state) = run(&page, ["SCROLL"], 5).await;

    assert_eq!(report.final_status, StepStatus::Error);
    assert_eq!(state, SessionState::Error);
    let last = report.steps.last().unwrap();
    assert_eq!(last.action, "ERROR");
    assert!(last.message.starts_with("Error:"));
}

#[tokio::test]
async fn browser_is_released_exactly_once_on_every_terminal_path() {
    for directives in [
        vec!["TASK_COMPLETE"],
        vec!["TASK_FAILED"],
        vec!["SCROLL"; 10],
    ] {
        let page = FakePage::new();
        let releases = page.release_counter();
        let driver = SessionDriver::new(test_config(), ScriptedEngine::new(directives));
        let dyn_page: Arc<dyn Page> = page.clone();
        drop(page);

        let mut session = driver
            .start_session(dyn_page, "https://example.com")
            .await
            .unwrap();
        let _ = driver.run_task(&mut session, "anything", 3).await;
        assert_eq!(releases.load(Ordering::SeqCst), 0);
        session.close();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn browser_is_released_after_a_mid_action_fault() {
    let page = FakePage::new();
    page.set_elements("button", vec![button("Go")]);
    page.fail_clicks();
    let releases = page.release_counter();
    let driver = SessionDriver::new(test_config(), ScriptedEngine::new(["CLICK button 'Go'"]));
    let dyn_page: Arc<dyn Page> = page.clone();
    drop(page);

    let mut session = driver
        .start_session(dyn_page, "https://example.com")
        .await
        .unwrap();
    let report = driver.run_task(&mut session, "anything", 3).await;
    assert_eq!(report.final_status, StepStatus::Error);
    session.close();
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pricing_link_scenario_runs_end_to_end() {
    let page = FakePage::new();
    page.set_elements("a", vec![link("Home"), link("Pricing")]);
    page.set_click_navigates_to("https://example.com/pricing");

    let (report, state) = run(&page, ["CLICK link 'Pricing'", "TASK_COMPLETE"], 5).await;

    assert_eq!(report.steps[1].status, StepStatus::Continue);
    assert_eq!(report.steps[1].message, "Clicked link: Pricing");
    assert_eq!(page.clicks(), vec![("a".to_string(), 1)]);
    assert_eq!(report.url, "https://example.com/pricing");
    assert_eq!(report.final_status, StepStatus::Complete);
    assert_eq!(state, SessionState::Complete);
    assert_eq!(report.total_steps, 2);
}

#[tokio::test]
async fn every_step_records_a_screenshot() {
    let page = FakePage::new();
    let (report, _) = run(&page, ["SCROLL", "TASK_COMPLETE"], 5).await;

    for step in &report.steps {
        assert!(!step.screenshot.is_empty(), "step {} lost its screenshot", step.step_number);
    }
}
