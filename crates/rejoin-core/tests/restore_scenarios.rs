use pretty_assertions::assert_eq;
use rejoin_core::{
    ArrivalOutcome, AuditKind, DepartureOutcome, EventOutcome, HandlerOptions, MemberEvent,
    PersistError, PlatformError, UnmatchedRecordPolicy, RESTORE_REASON,
};
use rejoin_test_utils::{
    mod_config, setup_service, setup_service_with, RecordingPlatform, COMMUNITY,
};
use rejoin_types::{roles, MemberSnapshot, PersistedStateRecord, RestoreConfig, RestoredField};
use tokio_test::{assert_err, assert_ok};

fn leave(member: MemberSnapshot) -> MemberEvent {
    MemberEvent::departed(COMMUNITY, member)
}

fn join(id: &str, live: &[&str]) -> MemberEvent {
    MemberEvent::arrived(
        COMMUNITY,
        MemberSnapshot::new(id).with_roles(roles(live.iter().copied())),
    )
}

#[tokio::test]
async fn test_leave_and_rejoin_restores_roles_and_nickname() {
    let t = setup_service(mod_config(), RecordingPlatform::new());

    let departed = t
        .service
        .dispatch(&leave(
            MemberSnapshot::new("m1")
                .with_roles(roles(["mod", "member"]))
                .with_nickname("Al"),
        ))
        .await
        .unwrap();
    assert!(matches!(
        departed,
        EventOutcome::Departed(DepartureOutcome::Persisted(_))
    ));
    assert_eq!(
        t.record("m1").await,
        Some(
            PersistedStateRecord::new()
                .with_roles(roles(["mod"]))
                .with_nickname("Al")
        )
    );

    let arrived = t.service.dispatch(&join("m1", &["member"])).await.unwrap();
    match arrived {
        EventOutcome::Arrived(ArrivalOutcome::Restored { restored, edit }) => {
            assert_eq!(restored, vec![RestoredField::Roles, RestoredField::Nickname]);
            assert_eq!(edit.roles, Some(roles(["mod", "member"])));
            assert_eq!(edit.nickname.as_deref(), Some("Al"));
        }
        other => panic!("expected restore, got {other:?}"),
    }

    let calls = t.platform.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].reason, RESTORE_REASON);
    assert_eq!(t.record("m1").await, None);

    let audit = t.audit.of_kind(AuditKind::MemberRestore);
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].restored_data, "roles, nickname");
    assert_eq!(audit[0].member.id.as_str(), "m1");
}

#[tokio::test]
async fn test_member_without_eligible_state_is_not_recorded() {
    let t = setup_service(mod_config(), RecordingPlatform::new());

    let departed = t
        .service
        .dispatch(&leave(MemberSnapshot::new("m1").with_roles(roles(["member"]))))
        .await
        .unwrap();
    assert_eq!(
        departed,
        EventOutcome::Departed(DepartureOutcome::NothingToPersist)
    );
    assert!(t.store.inner().is_empty());

    let arrived = t.service.dispatch(&join("m1", &["member"])).await.unwrap();
    assert_eq!(arrived, EventOutcome::Arrived(ArrivalOutcome::NoRecord));
    assert!(t.platform.calls().is_empty());
    assert!(t.audit.events().is_empty());
}

#[tokio::test]
async fn test_second_arrival_is_noop() {
    let t = setup_service(mod_config(), RecordingPlatform::new());
    assert_ok!(
        t.service
            .dispatch(&leave(MemberSnapshot::new("m1").with_roles(roles(["mod"]))))
            .await
    );

    let first = t.service.dispatch(&join("m1", &[])).await.unwrap();
    let second = t.service.dispatch(&join("m1", &[])).await.unwrap();

    assert!(matches!(
        first,
        EventOutcome::Arrived(ArrivalOutcome::Restored { .. })
    ));
    assert_eq!(second, EventOutcome::Arrived(ArrivalOutcome::NoRecord));
    assert_eq!(t.platform.calls().len(), 1);
}

#[tokio::test]
async fn test_restore_keeps_every_platform_assigned_role() {
    let t = setup_service(mod_config(), RecordingPlatform::new());
    assert_ok!(
        t.service
            .dispatch(&leave(MemberSnapshot::new("m1").with_roles(roles(["mod"]))))
            .await
    );

    assert_ok!(
        t.service
            .dispatch(&join("m1", &["member", "verified", "mod"]))
            .await
    );

    let roles_sent = t.platform.calls()[0].edit.roles.clone().unwrap();
    assert_eq!(roles_sent, roles(["mod", "member", "verified"]));
}

#[tokio::test]
async fn test_config_change_leaves_unmatched_record() {
    let t = setup_service(mod_config(), RecordingPlatform::new());
    assert_ok!(
        t.service
            .dispatch(&leave(MemberSnapshot::new("m1").with_roles(roles(["mod"]))))
            .await
    );

    // Eligible roles changed and nicknames are off
    t.config.set(
        COMMUNITY.into(),
        RestoreConfig::new().with_persisted_roles(roles(["vip"])),
    );

    let arrived = t.service.dispatch(&join("m1", &["member"])).await.unwrap();
    assert_eq!(
        arrived,
        EventOutcome::Arrived(ArrivalOutcome::NothingMatched { cleared: false })
    );
    assert!(t.platform.calls().is_empty());
    assert_eq!(
        t.record("m1").await,
        Some(PersistedStateRecord::new().with_roles(roles(["mod"])))
    );

    // Config matching again later restores from the kept record
    t.config.set(COMMUNITY.into(), mod_config());
    let arrived = t.service.dispatch(&join("m1", &["member"])).await.unwrap();
    assert!(matches!(
        arrived,
        EventOutcome::Arrived(ArrivalOutcome::Restored { .. })
    ));
}

#[tokio::test]
async fn test_clear_policy_removes_unmatched_record() {
    let t = setup_service_with(
        mod_config(),
        RecordingPlatform::new(),
        HandlerOptions::new().with_unmatched_record(UnmatchedRecordPolicy::Clear),
    );
    assert_ok!(
        t.service
            .dispatch(&leave(MemberSnapshot::new("m1").with_nickname("Al")))
            .await
    );
    t.config.set(COMMUNITY.into(), RestoreConfig::new());

    let arrived = t.service.dispatch(&join("m1", &[])).await.unwrap();

    assert_eq!(
        arrived,
        EventOutcome::Arrived(ArrivalOutcome::NothingMatched { cleared: true })
    );
    assert_eq!(t.record("m1").await, None);
    assert!(t.platform.calls().is_empty());
}

#[tokio::test]
async fn test_repeated_departure_replaces_record() {
    let t = setup_service(mod_config(), RecordingPlatform::new());

    assert_ok!(
        t.service
            .dispatch(&leave(
                MemberSnapshot::new("m1")
                    .with_roles(roles(["mod"]))
                    .with_nickname("Al"),
            ))
            .await
    );
    assert_ok!(
        t.service
            .dispatch(&leave(MemberSnapshot::new("m1").with_nickname("Bo")))
            .await
    );

    assert_eq!(
        t.record("m1").await,
        Some(PersistedStateRecord::new().with_nickname("Bo"))
    );
}

#[tokio::test]
async fn test_rejected_edit_preserves_record_for_retry() {
    let t = setup_service(mod_config(), RecordingPlatform::new());
    assert_ok!(
        t.service
            .dispatch(&leave(
                MemberSnapshot::new("m1")
                    .with_roles(roles(["mod"]))
                    .with_nickname("Al"),
            ))
            .await
    );

    t.platform.fail_with(Some(PlatformError::rejected("missing permissions")));
    let err = assert_err!(t.service.dispatch(&join("m1", &["member"])).await);
    assert!(matches!(err, PersistError::ProfileEditRejected { .. }));
    assert!(t.record("m1").await.is_some());
    assert_eq!(t.audit.of_kind(AuditKind::MemberRestoreFailed).len(), 1);

    // Edit carried both fields in one call
    let calls = t.platform.calls();
    let failed_edit = &calls[0].edit;
    assert!(failed_edit.roles.is_some() && failed_edit.nickname.is_some());

    // Rejoin after the platform recovers restores normally
    t.platform.fail_with(None);
    let arrived = t.service.dispatch(&join("m1", &["member"])).await.unwrap();
    assert!(matches!(
        arrived,
        EventOutcome::Arrived(ArrivalOutcome::Restored { .. })
    ));
    assert!(t.record("m1").await.is_none());
}

#[tokio::test]
async fn test_store_failure_on_read_propagates_and_unlocks() {
    let t = setup_service(mod_config(), RecordingPlatform::new());
    assert_ok!(
        t.service
            .dispatch(&leave(MemberSnapshot::new("m1").with_roles(roles(["mod"]))))
            .await
    );

    t.store.fail_find(true);
    let err = assert_err!(t.service.dispatch(&join("m1", &[])).await);
    assert!(matches!(err, PersistError::Store(_)));
    assert!(err.is_retryable());
    assert!(t.service.arrivals().locks().is_empty());
    assert!(t.platform.calls().is_empty());

    t.store.fail_find(false);
    let arrived = t.service.dispatch(&join("m1", &[])).await.unwrap();
    assert!(matches!(
        arrived,
        EventOutcome::Arrived(ArrivalOutcome::Restored { .. })
    ));
}

#[tokio::test]
async fn test_store_failure_on_clear_keeps_record() {
    let t = setup_service(mod_config(), RecordingPlatform::new());
    assert_ok!(
        t.service
            .dispatch(&leave(MemberSnapshot::new("m1").with_nickname("Al")))
            .await
    );

    t.store.fail_clear(true);
    let err = assert_err!(t.service.dispatch(&join("m1", &[])).await);

    assert!(matches!(err, PersistError::Store(_)));
    assert!(t.record("m1").await.is_some());
    assert!(t.audit.of_kind(AuditKind::MemberRestore).is_empty());
    assert!(t.service.arrivals().locks().is_empty());

    // The profile was edited, so the failure is audited
    assert_eq!(t.platform.calls().len(), 1);
    let failed = t.audit.of_kind(AuditKind::MemberRestoreFailed);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].restored_data, "nickname");
    assert!(failed[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("not cleared")));
}

#[tokio::test]
async fn test_store_failure_on_departure_propagates() {
    let t = setup_service(mod_config(), RecordingPlatform::new());
    t.store.fail_set(true);

    let err = assert_err!(
        t.service
            .dispatch(&leave(MemberSnapshot::new("m1").with_nickname("Al")))
            .await
    );
    assert!(matches!(err, PersistError::Store(_)));
    assert!(t.store.inner().is_empty());
}
