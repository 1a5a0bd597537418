//! Composite Suspension & Resume Integration Tests
//!
//! A document review pipeline where high-priority documents wait for a human
//! approval decision:
//! - Suspended items are bundled into one composite interrupt
//! - Resume re-runs exactly the suspended items, never the completed ones
//! - Partial approvals lead to a second suspension that keeps earlier results
//! - Inputs passed on resume are ignored in favour of the original inputs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::json;

use plan_cascade_batch::{
    extract_interrupt_info, interrupt, AppError, BatchInterruptState, BatchNode, BatchNodeConfig,
    BatchOptions, BatchOutcome, Compilable, CoreError, InterruptSignal, Lambda, RunContext,
};

// ============================================================================
// Helpers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ReviewRequest {
    document_id: String,
    priority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ReviewResult {
    document_id: String,
    approved: bool,
    reviewer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApprovalDecision {
    approved: bool,
}

fn documents() -> Vec<ReviewRequest> {
    ["high", "medium", "high", "low"]
        .iter()
        .enumerate()
        .map(|(i, priority)| ReviewRequest {
            document_id: format!("DOC-{:03}", i + 1),
            priority: priority.to_string(),
        })
        .collect()
}

/// Review task: high-priority documents wait for a human decision,
/// everything else is approved automatically. Records every execution.
fn review_task(executions: Arc<Mutex<Vec<String>>>) -> Arc<dyn Compilable<ReviewRequest, ReviewResult>> {
    Arc::new(Lambda::new(move |ctx: RunContext, req: ReviewRequest| {
        let executions = executions.clone();
        async move {
            executions.lock().unwrap().push(req.document_id.clone());

            if req.priority != "high" {
                return Ok(ReviewResult {
                    document_id: req.document_id,
                    approved: true,
                    reviewer: "auto".to_string(),
                });
            }

            match ctx.resume_data::<ApprovalDecision>()? {
                Some(decision) => Ok(ReviewResult {
                    document_id: req.document_id,
                    approved: decision.approved,
                    reviewer: "human".to_string(),
                }),
                None => Err(interrupt(
                    &ctx,
                    json!({"document_id": req.document_id, "reason": "high priority"}),
                )),
            }
        }
    }))
}

fn review_node(executions: Arc<Mutex<Vec<String>>>, max_concurrency: usize) -> BatchNode<ReviewRequest, ReviewResult> {
    BatchNode::new(
        BatchNodeConfig::new("DocumentReviewer").with_max_concurrency(max_concurrency),
        review_task(executions),
    )
}

fn expect_interrupt(outcome: BatchOutcome<ReviewResult>) -> InterruptSignal {
    match outcome {
        BatchOutcome::Interrupted(signal) => signal,
        BatchOutcome::Completed(outputs) => panic!("Expected interrupt, got {:?}", outputs),
    }
}

fn batch_ctx() -> RunContext {
    RunContext::new().append_address_segment("node", "review_batch")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_high_priority_documents_suspend_together() {
    for max_concurrency in [0usize, 2] {
        let executions = Arc::new(Mutex::new(Vec::new()));
        let node = review_node(executions.clone(), max_concurrency);

        let outcome = node
            .invoke(&batch_ctx(), documents(), BatchOptions::new())
            .await
            .unwrap();
        let signal = expect_interrupt(outcome);

        assert_eq!(signal.id(), "node:review_batch");
        assert_eq!(signal.children.len(), 2);

        let info = extract_interrupt_info(&CoreError::interrupted(signal.clone())).unwrap();
        let ids: Vec<String> = info.contexts.iter().map(|c| c.id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                "node:review_batch;batch_process:0".to_string(),
                "node:review_batch;batch_process:2".to_string(),
            ]
        );
        assert_eq!(info.contexts[1].info.as_ref().unwrap()["document_id"], json!("DOC-003"));

        let state = BatchInterruptState::<ReviewRequest, ReviewResult>::from_signal(&signal).unwrap();
        assert_eq!(state.total_count, 4);
        assert_eq!(state.interrupted_indices, vec![0, 2]);
        assert_eq!(state.completed_results.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(state.original_inputs, documents());
        assert_eq!(executions.lock().unwrap().len(), 4);
    }
}

#[tokio::test]
async fn test_resume_reruns_only_suspended_items() {
    let executions = Arc::new(Mutex::new(Vec::new()));
    let node = review_node(executions.clone(), 3);

    let signal = expect_interrupt(
        node.invoke(&batch_ctx(), documents(), BatchOptions::new())
            .await
            .unwrap(),
    );
    executions.lock().unwrap().clear();

    let decisions: HashMap<String, serde_json::Value> = signal
        .contexts()
        .into_iter()
        .map(|c| {
            let approved = c.id.ends_with("batch_process:0");
            (c.id, json!({"approved": approved}))
        })
        .collect();
    let resume_ctx = batch_ctx().resume_from(&signal).batch_resume_with_data(decisions);

    let outcome = node
        .invoke(&resume_ctx, Vec::new(), BatchOptions::new())
        .await
        .unwrap();

    let outputs = outcome.outputs().unwrap().to_vec();
    assert_eq!(outputs.len(), 4);
    let ids: Vec<&str> = outputs.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, vec!["DOC-001", "DOC-002", "DOC-003", "DOC-004"]);
    assert!(outputs[0].approved);
    assert!(!outputs[2].approved);
    assert_eq!(outputs[0].reviewer, "human");
    assert_eq!(outputs[1].reviewer, "auto");

    // Items completed on the first pass are restored verbatim.
    let first_pass = BatchInterruptState::<ReviewRequest, ReviewResult>::from_signal(&signal).unwrap();
    assert_eq!(outputs[1], first_pass.completed_results[&1]);
    assert_eq!(outputs[3], first_pass.completed_results[&3]);

    let mut rerun = executions.lock().unwrap().clone();
    rerun.sort();
    assert_eq!(rerun, vec!["DOC-001".to_string(), "DOC-003".to_string()]);
}

#[tokio::test]
async fn test_partial_approval_suspends_again_and_keeps_results() {
    let executions = Arc::new(Mutex::new(Vec::new()));
    let node = review_node(executions.clone(), 0);

    let first = expect_interrupt(
        node.invoke(&batch_ctx(), documents(), BatchOptions::new())
            .await
            .unwrap(),
    );

    // Approve DOC-001 only.
    let resume_ctx = batch_ctx()
        .resume_from(&first)
        .with_resume_data("node:review_batch;batch_process:0", json!({"approved": true}));
    let second = expect_interrupt(
        node.invoke(&resume_ctx, Vec::new(), BatchOptions::new())
            .await
            .unwrap(),
    );

    let state = BatchInterruptState::<ReviewRequest, ReviewResult>::from_signal(&second).unwrap();
    assert_eq!(state.interrupted_indices, vec![2]);
    assert_eq!(
        state.completed_results.keys().copied().collect::<Vec<_>>(),
        vec![0, 1, 3]
    );
    assert!(state.validate().is_ok());
    assert_eq!(second.children.len(), 1);
    assert_eq!(second.children[0].id(), "node:review_batch;batch_process:2");

    // Approve DOC-003 against the second signal.
    executions.lock().unwrap().clear();
    let resume_ctx = batch_ctx()
        .resume_from(&second)
        .with_resume_data("node:review_batch;batch_process:2", json!({"approved": true}));
    let outcome = node
        .invoke(&resume_ctx, Vec::new(), BatchOptions::new())
        .await
        .unwrap();

    let outputs = outcome.outputs().unwrap();
    assert_eq!(outputs.len(), 4);
    assert!(outputs.iter().all(|r| r.approved));
    assert_eq!(*executions.lock().unwrap(), vec!["DOC-003".to_string()]);
}

#[tokio::test]
async fn test_resume_ignores_supplied_inputs() {
    let executions = Arc::new(Mutex::new(Vec::new()));
    let node = review_node(executions.clone(), 2);

    let signal = expect_interrupt(
        node.invoke(&batch_ctx(), documents(), BatchOptions::new())
            .await
            .unwrap(),
    );
    let decisions = signal
        .contexts()
        .into_iter()
        .map(|c| (c.id, json!({"approved": true})))
        .collect();
    let resume_ctx = batch_ctx().resume_from(&signal).batch_resume_with_data(decisions);

    let bogus = vec![ReviewRequest {
        document_id: "DOC-999".to_string(),
        priority: "low".to_string(),
    }];
    let outcome = node
        .invoke(&resume_ctx, bogus, BatchOptions::new())
        .await
        .unwrap();

    let outputs = outcome.outputs().unwrap();
    assert_eq!(outputs.len(), 4);
    assert!(outputs.iter().all(|r| r.document_id != "DOC-999"));
}

#[tokio::test]
async fn test_fully_completed_state_skips_compilation() {
    let executions = Arc::new(Mutex::new(Vec::new()));
    let node = review_node(executions.clone(), 0);

    let done = |id: &str| ReviewResult {
        document_id: id.to_string(),
        approved: true,
        reviewer: "auto".to_string(),
    };
    let state = BatchInterruptState {
        original_inputs: documents()[..2].to_vec(),
        completed_results: [(0, done("DOC-001")), (1, done("DOC-002"))].into_iter().collect(),
        interrupted_indices: vec![],
        total_count: 2,
    };
    let signal = plan_cascade_batch::composite_interrupt(
        &batch_ctx(),
        None,
        serde_json::to_value(&state).unwrap(),
        vec![],
    );

    let outcome = node
        .invoke(&batch_ctx().resume_from(&signal), Vec::new(), BatchOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome.outputs().unwrap().len(), 2);
    assert!(executions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_resume_state_is_rejected() {
    let node = review_node(Arc::new(Mutex::new(Vec::new())), 0);
    let signal = plan_cascade_batch::composite_interrupt(
        &batch_ctx(),
        None,
        json!({"originalInputs": "not a list"}),
        vec![],
    );

    let err = node
        .invoke(&batch_ctx().resume_from(&signal), Vec::new(), BatchOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ResumeState(_)));
}

#[tokio::test]
async fn test_nested_batch_suspension_bubbles_up() {
    let executions = Arc::new(Mutex::new(Vec::new()));
    let inner: Arc<dyn Compilable<Vec<ReviewRequest>, Vec<ReviewResult>>> =
        Arc::new(review_node(executions.clone(), 2));
    let outer = BatchNode::new(BatchNodeConfig::new("Departments"), inner);

    let groups = vec![documents()[1..2].to_vec(), documents()[..3].to_vec()];
    let outcome = outer
        .invoke(&batch_ctx(), groups.clone(), BatchOptions::new())
        .await
        .unwrap();
    let signal = match outcome {
        BatchOutcome::Interrupted(signal) => signal,
        BatchOutcome::Completed(_) => panic!("Expected interrupt"),
    };

    let leaf_ids: Vec<String> = signal.contexts().into_iter().map(|c| c.id).collect();
    assert_eq!(
        leaf_ids,
        vec![
            "node:review_batch;batch_process:1;batch_process:0".to_string(),
            "node:review_batch;batch_process:1;batch_process:2".to_string(),
        ]
    );

    let decisions = leaf_ids
        .into_iter()
        .map(|id| (id, json!({"approved": true})))
        .collect();
    let resume_ctx = batch_ctx().resume_from(&signal).batch_resume_with_data(decisions);
    executions.lock().unwrap().clear();

    let outcome = outer
        .invoke(&resume_ctx, Vec::new(), BatchOptions::new())
        .await
        .unwrap();
    let outputs = outcome.outputs().unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].len(), 1);
    assert_eq!(outputs[1].len(), 3);
    assert!(outputs[1].iter().all(|r| r.approved));

    let mut rerun = executions.lock().unwrap().clone();
    rerun.sort();
    assert_eq!(rerun, vec!["DOC-001".to_string(), "DOC-003".to_string()]);
}
