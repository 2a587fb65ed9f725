mod common;

use chrono::{Local, NaiveDate};
use common::{Harness, USER};
use std::time::Duration;
use tokio::time::Instant;
use zenn_core::{
    AuthState, CacheKey, CompletionFilter, CoordinatorConfig, Feedback, MutationError,
    MutationKind, NewTask, NotificationLevel, PillarScores, StoreError, Task, TaskStore,
    TransitionState,
};

fn key(filter: CompletionFilter) -> CacheKey {
    CacheKey::new(USER, filter)
}

#[tokio::test(start_paused = true)]
async fn hiding_keeps_row_visible_during_exit_animation() {
    let h = Harness::new();
    let task = h.seed("Hide me", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    let cache = h.coordinator.cache().clone();
    let started = Instant::now();

    let observe = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let transition = cache.transition(&task.id).unwrap();
        assert_eq!(transition.op, MutationKind::ToggleHidden);
        assert_eq!(transition.state, TransitionState::ExitAnimating);
        let visible = cache.visible_tasks(&key(CompletionFilter::All));
        assert_eq!(visible.len(), 1);
        assert!(visible[0].hidden);
    };
    let (outcome, ()) = tokio::join!(h.coordinator.toggle_hidden(&task.id), observe);

    let outcome = outcome.unwrap();
    assert!(outcome.is_success());
    assert!(started.elapsed() >= Duration::from_millis(350));
    assert!(cache.transition(&task.id).is_none());
    assert!(cache.visible_tasks(&key(CompletionFilter::All)).is_empty());
    assert!(h.stored(&task.id).await.hidden);
    assert_eq!(h.notifier.messages(), vec!["Task hidden.".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn showing_a_hidden_task_does_not_wait() {
    let h = Harness::new();
    let mut task = Task::new(USER, "Hidden", PillarScores::new(3, 3, 3));
    task.hidden = true;
    h.store.inner().insert_task(&task).unwrap();
    h.load(CompletionFilter::All).await;
    let started = Instant::now();

    let outcome = h.coordinator.toggle_hidden(&task.id).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(
        h.coordinator
            .cache()
            .visible_tasks(&key(CompletionFilter::All))
            .len(),
        1
    );
    assert_eq!(h.notifier.messages(), vec!["Task is visible again.".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn hidden_task_stays_out_of_view_during_other_mutations() {
    let h = Harness::new();
    let mut task = Task::new(USER, "Tucked away", PillarScores::new(3, 3, 3));
    task.hidden = true;
    task.mark_completed(chrono::Utc::now());
    h.store.inner().insert_task(&task).unwrap();
    h.load(CompletionFilter::All).await;
    h.store.set_delay(Some(Duration::from_millis(200)));
    let cache = h.coordinator.cache().clone();

    let observe_comment = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.transition(&task.id).is_some());
        assert!(cache.visible_tasks(&key(CompletionFilter::All)).is_empty());
    };
    let (comment, ()) = tokio::join!(
        h.coordinator.add_comment(&task.id, "still here"),
        observe_comment
    );
    assert!(comment.unwrap().is_success());

    let observe_feedback = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            cache.transition(&task.id).unwrap().op,
            MutationKind::SetFeedback
        );
        assert!(cache.visible_tasks(&key(CompletionFilter::All)).is_empty());
    };
    let (feedback, ()) = tokio::join!(
        h.coordinator.set_feedback(&task.id, Some(Feedback::Relief)),
        observe_feedback
    );
    assert!(feedback.unwrap().is_success());
    assert!(cache.visible_tasks(&key(CompletionFilter::All)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_hide_rolls_back_and_clears_transition() {
    let h = Harness::new();
    let task = h.seed("Stay", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    h.store.fail_next();

    let outcome = h.coordinator.toggle_hidden(&task.id).await.unwrap();

    assert!(matches!(
        outcome.settlement.error(),
        Some(StoreError::Unavailable(_))
    ));
    let cache = h.coordinator.cache();
    assert!(!cache.find_task(USER, &task.id).unwrap().hidden);
    assert_eq!(cache.pending_count(), 0);
    assert!(!h.stored(&task.id).await.hidden);

    let notes = h.notifier.take();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Error);
    assert_eq!(notes[0].message, "Could not update visibility.");
    assert_eq!(notes[0].task_id.as_deref(), Some(task.id.as_str()));
}

#[tokio::test(start_paused = true)]
async fn completion_toggles_completed_at_together() {
    let h = Harness::new();
    let task = h.seed("Finish", (4, 4, 4));
    h.load(CompletionFilter::All).await;
    h.load(CompletionFilter::Open).await;
    h.load(CompletionFilter::Completed).await;
    let cache = h.coordinator.cache().clone();

    let done = h.coordinator.toggle_complete(&task.id).await.unwrap();
    let done = done.settlement.value().unwrap().clone();
    assert!(done.completed);
    assert!(done.completed_at_time().is_some());
    assert!(cache.tasks(&key(CompletionFilter::Open)).unwrap().is_empty());
    assert_eq!(
        cache.tasks(&key(CompletionFilter::Completed)).unwrap(),
        vec![done.clone()]
    );

    let reopened = h.coordinator.toggle_complete(&task.id).await.unwrap();
    let reopened = reopened.settlement.value().unwrap().clone();
    assert!(!reopened.completed);
    assert_eq!(reopened.completed_at, None);
    assert_eq!(h.stored(&task.id).await, reopened);
    assert!(cache
        .tasks(&key(CompletionFilter::Completed))
        .unwrap()
        .is_empty());
    assert_eq!(
        h.notifier.messages(),
        vec![
            "Task completed.".to_string(),
            "Task moved back to your list.".to_string()
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn rollback_restores_original_position_in_every_collection() {
    let h = Harness::new();
    let a = h.seed("a", (3, 3, 3));
    let b = h.seed("b", (3, 3, 3));
    let c = h.seed("c", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    h.load(CompletionFilter::Open).await;
    let cache = h.coordinator.cache().clone();
    let all_before = cache.tasks(&key(CompletionFilter::All)).unwrap();
    let open_before = cache.tasks(&key(CompletionFilter::Open)).unwrap();
    assert_eq!(all_before.len(), 3);
    h.store.fail_on(&b.id);

    let outcome = h.coordinator.toggle_complete(&b.id).await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(cache.tasks(&key(CompletionFilter::All)).unwrap(), all_before);
    assert_eq!(cache.tasks(&key(CompletionFilter::Open)).unwrap(), open_before);
    assert!(cache.find_task(USER, &a.id).is_some());
    assert!(cache.find_task(USER, &c.id).is_some());
}

#[tokio::test(start_paused = true)]
async fn failure_on_one_task_leaves_concurrent_success_intact() {
    let h = Harness::new();
    let failing = h.seed("failing", (3, 3, 3));
    let passing = h.seed("passing", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    h.store.set_delay(Some(Duration::from_millis(200)));
    h.store.fail_on(&failing.id);

    let (first, second) = tokio::join!(
        h.coordinator.toggle_complete(&failing.id),
        h.coordinator.toggle_complete(&passing.id)
    );

    assert!(!first.unwrap().is_success());
    assert!(second.unwrap().is_success());
    let cache = h.coordinator.cache();
    assert!(!cache.find_task(USER, &failing.id).unwrap().completed);
    assert!(cache.find_task(USER, &passing.id).unwrap().completed);
    assert_eq!(cache.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn same_task_operations_apply_in_call_order() {
    let h = Harness::new();
    let task = h.seed("Ordered", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    h.store.set_delay(Some(Duration::from_millis(100)));

    let (complete, feedback) = tokio::join!(
        h.coordinator.toggle_complete(&task.id),
        h.coordinator.set_feedback(&task.id, Some(Feedback::Relief))
    );

    assert!(complete.unwrap().is_success());
    let feedback = feedback.unwrap();
    assert!(feedback.is_success());
    let stored = h.stored(&task.id).await;
    assert!(stored.completed);
    assert_eq!(stored.feedback, Some(Feedback::Relief));
    assert_eq!(
        h.coordinator.cache().find_task(USER, &task.id).unwrap(),
        stored
    );
}

#[tokio::test(start_paused = true)]
async fn double_toggle_settles_on_original_state() {
    let h = Harness::new();
    let task = h.seed("Twice", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    h.store.set_delay(Some(Duration::from_millis(100)));

    let (first, second) = tokio::join!(
        h.coordinator.toggle_hidden(&task.id),
        h.coordinator.toggle_hidden(&task.id)
    );

    assert!(first.unwrap().is_success());
    assert!(second.unwrap().is_success());
    assert!(!h.stored(&task.id).await.hidden);
    assert!(!h.coordinator.cache().find_task(USER, &task.id).unwrap().hidden);
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out_and_rolls_back() {
    let config = CoordinatorConfig::default().with_remote_timeout(Duration::from_secs(2));
    let h = Harness::with_config(config);
    let task = h.seed("Slow", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    h.store.set_delay(Some(Duration::from_secs(5)));
    let started = Instant::now();

    let outcome = h.coordinator.toggle_complete(&task.id).await.unwrap();

    assert!(matches!(
        outcome.settlement.error(),
        Some(StoreError::Timeout(limit)) if *limit == Duration::from_secs(2)
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!h.coordinator.cache().find_task(USER, &task.id).unwrap().completed);
    assert!(!h.stored(&task.id).await.completed);
}

#[tokio::test(start_paused = true)]
async fn feedback_requires_completed_task() {
    let h = Harness::new();
    let open = h.seed("Open", (3, 3, 3));
    let done = h.seed_completed("Done");
    h.load(CompletionFilter::All).await;
    let calls = h.store.calls();

    let err = h
        .coordinator
        .set_feedback(&open.id, Some(Feedback::Obligation))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::TaskNotCompleted(id) if id == open.id));
    assert_eq!(h.store.calls(), calls);

    let saved = h
        .coordinator
        .set_feedback(&done.id, Some(Feedback::Obligation))
        .await
        .unwrap();
    assert_eq!(
        saved.settlement.value().unwrap().feedback,
        Some(Feedback::Obligation)
    );
    let cleared = h.coordinator.set_feedback(&done.id, None).await.unwrap();
    assert_eq!(cleared.settlement.value().unwrap().feedback, None);
    assert_eq!(
        h.notifier.messages(),
        vec!["Feedback saved.".to_string(), "Feedback cleared.".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn restore_plans_and_assigns_today_when_unscheduled() {
    let h = Harness::new();
    let task = h.seed_completed("Again");
    h.load(CompletionFilter::All).await;
    let today = Local::now().date_naive();

    let plan = h.coordinator.plan_restore(&task.id).unwrap();
    assert_eq!(plan.assigns_ideal_date, Some(today));
    assert!(plan.notice.contains(&today.format("%Y-%m-%d").to_string()));
    assert_eq!(h.coordinator.cache().pending_count(), 0);

    let outcome = h.coordinator.restore(&task.id).await.unwrap();
    let restored = outcome.settlement.value().unwrap();
    assert!(!restored.completed);
    assert_eq!(restored.completed_at, None);
    assert_eq!(restored.ideal_date, Some(today));
    assert_eq!(h.notifier.messages(), vec!["Task restored to your list.".to_string()]);

    assert!(matches!(
        h.coordinator.restore(&task.id).await,
        Err(MutationError::TaskNotCompleted(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn restore_keeps_existing_ideal_date() {
    let h = Harness::new();
    let mut task = Task::new(USER, "Planned", PillarScores::new(3, 3, 3));
    task.ideal_date = NaiveDate::from_ymd_opt(2026, 1, 15);
    task.mark_completed(chrono::Utc::now());
    h.store.inner().insert_task(&task).unwrap();
    h.load(CompletionFilter::All).await;

    let plan = h.coordinator.plan_restore(&task.id).unwrap();
    assert_eq!(plan.assigns_ideal_date, None);

    let outcome = h.coordinator.restore(&task.id).await.unwrap();
    assert_eq!(
        outcome.settlement.value().unwrap().ideal_date,
        NaiveDate::from_ymd_opt(2026, 1, 15)
    );
}

#[tokio::test(start_paused = true)]
async fn failed_restore_keeps_task_completed() {
    let h = Harness::new();
    let task = h.seed_completed("Stuck");
    h.load(CompletionFilter::All).await;
    h.store.fail_next();

    let outcome = h.coordinator.restore(&task.id).await.unwrap();

    assert!(!outcome.is_success());
    let cached = h.coordinator.cache().find_task(USER, &task.id).unwrap();
    assert!(cached.completed);
    assert_eq!(cached.ideal_date, None);
    assert_eq!(h.notifier.messages(), vec!["Could not restore the task.".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn comment_shows_placeholder_until_confirmed() {
    let h = Harness::new();
    let task = h.seed("Discuss", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    h.store.set_delay(Some(Duration::from_millis(200)));
    let cache = h.coordinator.cache().clone();

    let observe = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let comments = cache.comments(&task.id);
        assert_eq!(comments.len(), 1);
        assert!(comments[0].is_temporary());
        assert_eq!(comments[0].text, "first thought");
        assert_eq!(
            cache.transition(&task.id).unwrap().state,
            TransitionState::Pending
        );
    };
    let (outcome, ()) = tokio::join!(
        h.coordinator.add_comment(&task.id, "  first thought \n"),
        observe
    );

    let outcome = outcome.unwrap();
    let saved = outcome.settlement.value().unwrap();
    let comments = cache.comments(&task.id);
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, saved.id);
    assert!(!comments[0].is_temporary());
    assert_eq!(cache.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_comment_is_removed() {
    let h = Harness::new();
    let task = h.seed("Discuss", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    h.coordinator.add_comment(&task.id, "kept").await.unwrap();
    h.store.fail_next();

    let outcome = h.coordinator.add_comment(&task.id, "lost").await.unwrap();

    assert!(!outcome.is_success());
    let comments = h.coordinator.cache().comments(&task.id);
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "kept");
    assert_eq!(
        h.notifier.messages(),
        vec![
            "Comment added.".to_string(),
            "Could not add the comment.".to_string()
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn blank_comment_is_rejected_without_store_call() {
    let h = Harness::new();
    let task = h.seed("Quiet", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    let calls = h.store.calls();

    let err = h.coordinator.add_comment(&task.id, " \n\t ").await.unwrap_err();

    assert!(matches!(err, MutationError::EmptyComment));
    assert_eq!(h.store.calls(), calls);
    assert!(h.coordinator.cache().comments(&task.id).is_empty());
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_comment_delete_restores_position() {
    let h = Harness::new();
    let task = h.seed("Thread", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    for text in ["one", "two", "three"] {
        h.coordinator.add_comment(&task.id, text).await.unwrap();
    }
    let before = h.coordinator.cache().comments(&task.id);
    let middle = before[1].id.clone();
    h.store.fail_on(&middle);

    let outcome = h
        .coordinator
        .delete_comment(&task.id, &middle)
        .await
        .unwrap();

    assert!(!outcome.is_success());
    assert_eq!(h.coordinator.cache().comments(&task.id), before);

    let missing = h
        .coordinator
        .delete_comment(&task.id, "nope")
        .await
        .unwrap_err();
    assert!(matches!(missing, MutationError::CommentNotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn comment_delete_removes_it() {
    let h = Harness::new();
    let task = h.seed("Thread", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    let first = h.coordinator.add_comment(&task.id, "one").await.unwrap();
    let first_id = first.settlement.value().unwrap().id.clone();
    h.coordinator.add_comment(&task.id, "two").await.unwrap();

    let outcome = h
        .coordinator
        .delete_comment(&task.id, &first_id)
        .await
        .unwrap();

    assert!(outcome.is_success());
    let comments = h.coordinator.cache().comments(&task.id);
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "two");
}

#[tokio::test(start_paused = true)]
async fn created_task_enters_matching_collections_after_confirmation() {
    let h = Harness::new();
    let mut existing = Task::new(USER, "Existing", PillarScores::new(3, 3, 3));
    existing.created_at -= chrono::Duration::hours(1);
    h.store.inner().insert_task(&existing).unwrap();
    h.load(CompletionFilter::All).await;
    h.load(CompletionFilter::Open).await;
    h.load(CompletionFilter::Completed).await;

    let settled = h
        .coordinator
        .create_task(NewTask {
            title: "Brand new".to_string(),
            scores: PillarScores::new(5, 4, 3),
            ideal_date: None,
        })
        .await
        .unwrap();

    let created = settled.value().unwrap().clone();
    let cache = h.coordinator.cache();
    assert_eq!(cache.tasks(&key(CompletionFilter::All)).unwrap()[0], created);
    assert_eq!(cache.tasks(&key(CompletionFilter::Open)).unwrap()[0], created);
    assert!(cache
        .tasks(&key(CompletionFilter::Completed))
        .unwrap()
        .is_empty());
    assert_eq!(h.notifier.messages(), vec!["Task created.".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn invalid_or_failed_create_leaves_cache_untouched() {
    let h = Harness::new();
    h.load(CompletionFilter::All).await;
    let calls = h.store.calls();

    let err = h
        .coordinator
        .create_task(NewTask {
            title: "  ".to_string(),
            scores: PillarScores::new(3, 3, 3),
            ideal_date: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::InvalidTask(_)));
    assert_eq!(h.store.calls(), calls);

    h.store.fail_next();
    let settled = h
        .coordinator
        .create_task(NewTask {
            title: "Unlucky".to_string(),
            scores: PillarScores::new(3, 3, 3),
            ideal_date: None,
        })
        .await
        .unwrap();
    assert!(!settled.is_success());
    assert!(h
        .coordinator
        .cache()
        .tasks(&key(CompletionFilter::All))
        .unwrap()
        .is_empty());
    assert_eq!(h.notifier.messages(), vec!["Could not create the task.".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn failed_delete_brings_task_and_comments_back() {
    let h = Harness::new();
    let first = h.seed("first", (3, 3, 3));
    let target = h.seed("target", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    h.coordinator.add_comment(&target.id, "note").await.unwrap();
    let before = h.coordinator.cache().tasks(&key(CompletionFilter::All)).unwrap();
    h.store.fail_on(&target.id);

    let outcome = h.coordinator.delete_task(&target.id).await.unwrap();

    assert!(!outcome.is_success());
    let cache = h.coordinator.cache();
    assert_eq!(cache.tasks(&key(CompletionFilter::All)).unwrap(), before);
    assert_eq!(cache.comments(&target.id).len(), 1);
    assert!(cache.find_task(USER, &first.id).is_some());
}

#[tokio::test(start_paused = true)]
async fn delete_removes_task_from_cache_and_store() {
    let h = Harness::new();
    let task = h.seed("gone", (3, 3, 3));
    h.load(CompletionFilter::All).await;

    let outcome = h.coordinator.delete_task(&task.id).await.unwrap();

    assert!(outcome.is_success());
    assert!(h.coordinator.cache().find_task(USER, &task.id).is_none());
    let remaining = h
        .store
        .inner()
        .fetch_tasks(USER, CompletionFilter::All)
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test(start_paused = true)]
async fn preconditions_fail_before_any_change() {
    let h = Harness::new();
    let task = h.seed("Guarded", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    let revision = h.coordinator.cache().revision();

    assert!(matches!(
        h.coordinator.toggle_hidden("missing").await,
        Err(MutationError::TaskNotFound(id)) if id == "missing"
    ));

    h.auth.set(AuthState::Loading);
    assert!(matches!(
        h.coordinator.toggle_hidden(&task.id).await,
        Err(MutationError::AuthLoading)
    ));

    h.auth.set(AuthState::Anonymous);
    assert!(matches!(
        h.coordinator.toggle_complete(&task.id).await,
        Err(MutationError::Unauthenticated)
    ));
    assert!(matches!(
        h.coordinator.add_comment(&task.id, "hi").await,
        Err(MutationError::Unauthenticated)
    ));
    assert!(matches!(
        h.coordinator.load_tasks(CompletionFilter::All).await,
        Err(MutationError::Unauthenticated)
    ));

    assert_eq!(h.coordinator.cache().revision(), revision);
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn switching_user_drops_previous_cache() {
    let h = Harness::new();
    let task = h.seed("Mine", (3, 3, 3));
    h.load(CompletionFilter::All).await;

    h.auth.set(AuthState::Authenticated("user-2".to_string()));
    assert!(matches!(
        h.coordinator.toggle_hidden(&task.id).await,
        Err(MutationError::TaskNotFound(_))
    ));
    assert!(h.coordinator.cache().user_tasks(USER).is_empty());
    assert_eq!(h.coordinator.cache().session_user().as_deref(), Some("user-2"));

    h.coordinator.end_session();
    assert_eq!(h.coordinator.cache().session_user(), None);
}

#[tokio::test(start_paused = true)]
async fn failed_load_keeps_previous_collection() {
    let h = Harness::new();
    h.seed("Cached", (3, 3, 3));
    h.load(CompletionFilter::All).await;
    h.store.fail_next();

    let err = h
        .coordinator
        .load_tasks(CompletionFilter::All)
        .await
        .unwrap_err();

    assert!(matches!(err, MutationError::Load(StoreError::Unavailable(_))));
    assert_eq!(
        h.coordinator
            .cache()
            .tasks(&key(CompletionFilter::All))
            .unwrap()
            .len(),
        1
    );
}
