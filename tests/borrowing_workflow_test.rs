//! Testes do workflow de empréstimo/devolução direto nos services, com o
//! store em memória.

mod common;

use lab_backend::{
    common::error::{AppError, Resource},
    db::{LabStore, StoreError},
    models::{
        auth::Role,
        borrowing::{ApprovalStatus, BorrowStatus, Borrowing, BorrowingFilter, NewBorrowing, PendingReturn},
        item::Item,
        verification::{VerificationLogFilter, VerificationStatus},
    },
    services::borrowing_service::BorrowRequest,
};
use uuid::Uuid;

use common::{user, TestApp};

async fn request(app: &TestApp, item: &Item) -> Borrowing {
    app.state
        .borrowing_service
        .request_borrow(BorrowRequest {
            user_id: app.student.id,
            user_name: app.student.name.clone(),
            item_id: item.id,
            item_code: None,
            item_name: None,
            notes: Some("Aula de física".into()),
        })
        .await
        .expect("request borrow")
}

async fn stock_of(app: &TestApp, item: &Item) -> i32 {
    app.store.get_item(item.id).await.unwrap().unwrap().stock
}

// ==================== Ciclo completo ====================

#[tokio::test]
async fn full_lifecycle_reserves_and_returns_one_unit() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-001", 1).await;

    // 1. Pedido: nada é reservado
    let b = request(&app, &item).await;
    assert_eq!(b.approval_status, ApprovalStatus::Pending);
    assert_eq!(b.status, BorrowStatus::Borrowed);
    assert_eq!(b.return_approval_status, None);
    assert_eq!(b.item_code, "LAB-001");
    assert_eq!(stock_of(&app, &item).await, 1);

    // 2. Aprovação: reserva
    let b = service.approve_borrow(b.id).await.unwrap();
    assert_eq!(b.approval_status, ApprovalStatus::Approved);
    assert_eq!(stock_of(&app, &item).await, 0);

    // 3. Pedido de devolução
    let b = service.request_return(b.id).await.unwrap();
    assert_eq!(b.return_approval_status, Some(ApprovalStatus::Pending));

    // 4. Técnico aprova conferindo pelo código da etiqueta
    let b = service.approve_return(b.id, "LAB-001").await.unwrap();
    assert_eq!(b.status, BorrowStatus::Returned);
    assert_eq!(b.return_approval_status, Some(ApprovalStatus::Approved));
    assert!(b.return_date.is_some());
    assert_eq!(stock_of(&app, &item).await, 1);
}

#[tokio::test]
async fn approve_return_is_allowed_without_a_return_request() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-002", 2).await;

    let b = request(&app, &item).await;
    service.approve_borrow(b.id).await.unwrap();
    assert_eq!(stock_of(&app, &item).await, 1);

    let b = service.approve_return(b.id, &item.id.to_string()).await.unwrap();
    assert_eq!(b.status, BorrowStatus::Returned);
    assert_eq!(stock_of(&app, &item).await, 2);
}

#[tokio::test]
async fn rejected_return_keeps_unit_and_can_be_requested_again() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-003", 1).await;

    let b = request(&app, &item).await;
    service.approve_borrow(b.id).await.unwrap();
    service.request_return(b.id).await.unwrap();

    let b = service.reject_return(b.id).await.unwrap();
    assert_eq!(b.return_approval_status, Some(ApprovalStatus::Rejected));
    assert_eq!(b.status, BorrowStatus::Borrowed);
    assert_eq!(stock_of(&app, &item).await, 0);

    let b = service.request_return(b.id).await.unwrap();
    assert_eq!(b.return_approval_status, Some(ApprovalStatus::Pending));

    service.approve_return(b.id, "LAB-003").await.unwrap();
    assert_eq!(stock_of(&app, &item).await, 1);
}

// ==================== Transições recusadas ====================

#[tokio::test]
async fn rejected_borrow_is_terminal() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-004", 1).await;

    let b = request(&app, &item).await;
    let b = service.reject_borrow(b.id).await.unwrap();
    assert_eq!(b.approval_status, ApprovalStatus::Rejected);

    let err = service.approve_borrow(b.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState { .. }));
    let err = service.request_return(b.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState { .. }));
    assert_eq!(stock_of(&app, &item).await, 1);
}

#[tokio::test]
async fn return_cannot_be_rejected_before_it_is_requested() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-008", 1).await;

    let b = request(&app, &item).await;
    let active = service.approve_borrow(b.id).await.unwrap();

    let err = service.reject_return(b.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState { action: "reject_return", .. }));

    let unchanged = service.get_borrowing(b.id).await.unwrap();
    assert_eq!(unchanged.return_approval_status, None);
    assert_eq!(unchanged.version, active.version);
    assert_eq!(stock_of(&app, &item).await, 0);
}

#[tokio::test]
async fn second_approval_of_same_borrowing_is_refused() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-005", 3).await;

    let b = request(&app, &item).await;
    service.approve_borrow(b.id).await.unwrap();

    let err = service.approve_borrow(b.id).await.unwrap_err();
    assert_eq!(err.kind(), "INVALID_STATE");
    assert!(!err.is_retryable());
    assert_eq!(stock_of(&app, &item).await, 2);
}

#[tokio::test]
async fn missing_borrowing_is_not_found() {
    let app = TestApp::new();
    let err = app.state.borrowing_service.approve_borrow(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { resource: Resource::Borrowing, .. }));
}

#[tokio::test]
async fn request_for_unknown_or_empty_item_is_refused() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let empty = app.seed_item("LAB-006", 0).await;

    let err = service
        .request_borrow(BorrowRequest {
            user_id: app.student.id,
            user_name: app.student.name.clone(),
            item_id: Uuid::new_v4(),
            item_code: None,
            item_name: None,
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { resource: Resource::Item, .. }));

    let err = service
        .request_borrow(BorrowRequest {
            user_id: app.student.id,
            user_name: app.student.name.clone(),
            item_id: empty.id,
            item_code: None,
            item_name: None,
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutOfStock { .. }));
    assert!(service.list_borrowings(&BorrowingFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn approval_rechecks_stock_consumed_after_request() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-007", 1).await;

    // Os dois pedidos passam: a checagem no pedido é só informativa
    let first = request(&app, &item).await;
    let second = request(&app, &item).await;

    service.approve_borrow(first.id).await.unwrap();
    let err = service.approve_borrow(second.id).await.unwrap_err();
    assert!(matches!(err, AppError::OutOfStock { .. }));

    let second = service.get_borrowing(second.id).await.unwrap();
    assert_eq!(second.approval_status, ApprovalStatus::Pending);
    assert_eq!(stock_of(&app, &item).await, 0);
}

// ==================== Concorrência ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_of_same_borrowing_succeed_once() {
    let app = TestApp::new();
    let item = app.seed_item("LAB-010", 5).await;
    let borrowing_id = request(&app, &item).await.id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = app.state.borrowing_service.clone();
            tokio::spawn(async move { service.approve_borrow(borrowing_id).await })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) => assert!(matches!(e, AppError::InvalidState { .. }), "{e:?}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(stock_of(&app, &item).await, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_never_take_stock_below_zero() {
    let app = TestApp::new();
    let item = app.seed_item("LAB-011", 1).await;

    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(request(&app, &item).await.id);
    }

    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let service = app.state.borrowing_service.clone();
            tokio::spawn(async move { service.approve_borrow(id).await })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) => assert!(matches!(e, AppError::OutOfStock { .. }), "{e:?}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(stock_of(&app, &item).await, 0);

    let approved = app
        .state
        .borrowing_service
        .list_borrowings(&BorrowingFilter {
            approval_status: Some(ApprovalStatus::Approved),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(approved.len(), 1);
}

// ==================== Conferência do QR ====================

#[tokio::test]
async fn approve_return_with_other_items_code_changes_nothing() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let borrowed = app.seed_item("LAB-020", 1).await;
    let other = app.seed_item("LAB-021", 1).await;

    let b = request(&app, &borrowed).await;
    service.approve_borrow(b.id).await.unwrap();
    let before = service.request_return(b.id).await.unwrap();

    let err = service.approve_return(b.id, "LAB-021").await.unwrap_err();
    match &err {
        AppError::IdentityMismatch {
            expected_item_id,
            scanned,
            scanned_item_id,
            ..
        } => {
            assert_eq!(*expected_item_id, borrowed.id);
            assert_eq!(scanned, "LAB-021");
            assert_eq!(*scanned_item_id, Some(other.id));
        }
        other => panic!("esperava IdentityMismatch, veio {other:?}"),
    }

    let after = service.get_borrowing(b.id).await.unwrap();
    assert_eq!(after.version, before.version);
    assert_eq!(after.return_approval_status, Some(ApprovalStatus::Pending));
    assert_eq!(stock_of(&app, &borrowed).await, 0);
    assert_eq!(stock_of(&app, &other).await, 1);
}

#[tokio::test]
async fn unknown_code_on_return_is_not_found() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-022", 1).await;
    let b = request(&app, &item).await;
    service.approve_borrow(b.id).await.unwrap();

    let err = service.verify_return_identity(b.id, "NAO-EXISTE").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { resource: Resource::ItemCode, .. }));
}

#[tokio::test]
async fn duplicated_code_matches_when_one_of_them_is_the_borrowed_item() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let borrowed = app.seed_item("LAB-DUP", 1).await;
    app.seed_item("LAB-DUP", 1).await;

    let b = request(&app, &borrowed).await;
    service.approve_borrow(b.id).await.unwrap();

    let resolved = service.verify_return_identity(b.id, "LAB-DUP").await.unwrap();
    assert_eq!(resolved.item.id, borrowed.id);
}

#[tokio::test]
async fn return_verification_fails_when_item_was_deleted() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-023", 1).await;
    let b = request(&app, &item).await;
    service.reject_borrow(b.id).await.unwrap();

    // Empréstimo rejeitado não segura o item
    app.state.item_service.delete_item(item.id).await.unwrap();

    let err = service.verify_return_identity(b.id, &item.id.to_string()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { resource: Resource::Item, .. }));
}

// ==================== Devolução pela tela de leitura ====================

#[tokio::test]
async fn submit_return_checks_owner_context_and_identity() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-030", 1).await;
    let b = request(&app, &item).await;

    // Ainda não aprovado: não dá para abrir a devolução
    let err = service.begin_return(&app.student, b.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState { .. }));

    service.approve_borrow(b.id).await.unwrap();

    // Outro aluno não pode devolver
    let intruder = user("Bruno", Role::Student);
    let err = service.begin_return(&intruder, b.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let pending = service.begin_return(&app.student, b.id).await.unwrap();
    assert_eq!(
        pending,
        PendingReturn {
            borrowing_id: b.id,
            expected_item_id: item.id
        }
    );

    // Contexto montado para outro item
    let stale = PendingReturn {
        expected_item_id: Uuid::new_v4(),
        ..pending
    };
    let err = service.submit_return(&app.student, stale, "LAB-030").await.unwrap_err();
    assert!(matches!(err, AppError::IdentityMismatch { .. }));

    let submission = service.submit_return(&app.student, pending, " LAB-030 ").await.unwrap();
    assert_eq!(submission.item.id, item.id);
    assert_eq!(submission.borrowing.return_approval_status, Some(ApprovalStatus::Pending));
    // Devolução só volta ao estoque com a aprovação do técnico
    assert_eq!(stock_of(&app, &item).await, 0);
}

// ==================== Catálogo e leituras ====================

#[tokio::test]
async fn item_with_open_borrowing_cannot_be_deleted() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let items = &app.state.item_service;
    let item = app.seed_item("LAB-040", 2).await;

    let b = request(&app, &item).await;
    let err = items.delete_item(item.id).await.unwrap_err();
    assert!(matches!(err, AppError::ItemInUse { active: 1, .. }));
    assert_eq!(err.kind(), "CONFLICT");

    service.approve_borrow(b.id).await.unwrap();
    assert!(items.delete_item(item.id).await.is_err());

    service.approve_return(b.id, "LAB-040").await.unwrap();
    items.delete_item(item.id).await.unwrap();
    assert!(matches!(
        items.get_item(item.id).await.unwrap_err(),
        AppError::NotFound { resource: Resource::Item, .. }
    ));
}

#[tokio::test]
async fn borrowing_is_not_created_for_a_deleted_item() {
    let app = TestApp::new();
    let item = app.seed_item("LAB-041", 1).await;
    app.state.item_service.delete_item(item.id).await.unwrap();

    // Pedido que leu o item antes da remoção: a inserção confere de novo
    let err = app
        .store
        .insert_borrowing(NewBorrowing {
            user_id: app.student.id,
            user_name: app.student.name.clone(),
            item_id: item.id,
            item_code: item.code.clone(),
            item_name: item.name.clone(),
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ItemMissing(id) if id == item.id));

    let open = app
        .store
        .query_borrowings(&BorrowingFilter {
            item_id: Some(item.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(open.is_empty());
}

#[tokio::test]
async fn every_scan_is_logged_newest_first() {
    let app = TestApp::new();
    let verification = &app.state.verification_service;
    let item = app.seed_item("LAB-050", 1).await;

    let valid = verification.verify_scan(&app.staff, "LAB-050", None).await.unwrap();
    assert_eq!(valid.log.status, VerificationStatus::Valid);
    assert_eq!(valid.log.item_id, Some(item.id));

    let invalid = verification
        .verify_scan(&app.staff, "???", Some("etiqueta rasgada".into()))
        .await
        .unwrap();
    assert_eq!(invalid.log.status, VerificationStatus::Invalid);
    assert!(invalid.item.is_none());

    let logs = verification.list_logs(&VerificationLogFilter::default()).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].barcode, "???");
    assert_eq!(logs[1].barcode, "LAB-050");

    let by_barcode = verification
        .list_logs(&VerificationLogFilter {
            barcode: Some("LAB-050".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_barcode.len(), 1);
}

#[tokio::test]
async fn workflow_itself_writes_no_scan_logs() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let item = app.seed_item("LAB-051", 1).await;
    let b = request(&app, &item).await;
    service.approve_borrow(b.id).await.unwrap();
    service.approve_return(b.id, "LAB-051").await.unwrap();

    let logs = app.state.verification_service.list_logs(&VerificationLogFilter::default()).await.unwrap();
    assert!(logs.is_empty());
}

#[tokio::test]
async fn dashboard_counts_queues_and_stock() {
    let app = TestApp::new();
    let service = &app.state.borrowing_service;
    let a = app.seed_item("LAB-060", 3).await;
    let b_item = app.seed_item("LAB-061", 1).await;

    let pending = request(&app, &a).await;
    let active = request(&app, &a).await;
    service.approve_borrow(active.id).await.unwrap();
    let returning = request(&app, &b_item).await;
    service.approve_borrow(returning.id).await.unwrap();
    service.request_return(returning.id).await.unwrap();
    app.state.verification_service.verify_scan(&app.staff, "LAB-060", None).await.unwrap();

    let summary = app.state.dashboard_service.get_summary(5).await.unwrap();
    assert_eq!(summary.total_items, 2);
    assert_eq!(summary.good_condition, 2);
    assert_eq!(summary.total_units_in_stock, 2);
    assert_eq!(summary.pending_borrow_approvals, 1);
    // Devolução pendente ainda conta como empréstimo ativo
    assert_eq!(summary.active_borrowings, 2);
    assert_eq!(summary.pending_return_approvals, 1);
    assert_eq!(summary.total_scans, 1);
    assert_eq!(summary.recent_scans.len(), 1);
    assert_ne!(pending.id, active.id);
}

#[tokio::test]
async fn dashboard_total_scans_is_not_capped_by_recent_list() {
    let app = TestApp::new();
    let verification = &app.state.verification_service;
    app.seed_item("LAB-062", 1).await;
    for code in ["LAB-062", "XYZ", "LAB-062"] {
        verification.verify_scan(&app.student, code, None).await.unwrap();
    }

    let summary = app.state.dashboard_service.get_summary(2).await.unwrap();
    assert_eq!(summary.total_scans, 3);
    assert_eq!(summary.recent_scans.len(), 2);
    assert_eq!(summary.recent_scans[0].barcode, "LAB-062");
    assert_eq!(summary.recent_scans[1].barcode, "XYZ");
}
