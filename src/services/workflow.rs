// src/services/workflow.rs
//
// Regras puras do ciclo de vida de um empréstimo: dado o registro atual,
// o estoque do item e a ação pedida, decide o próximo estado e o delta de
// estoque. Não faz I/O.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::{
    common::error::{AppError, Resource},
    models::borrowing::{ApprovalStatus, BorrowStatus, Borrowing, BorrowingTransition},
};

/// Estado composto a partir de `status`, `approval_status` e `return_approval_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowingState {
    Requested,       // approval = pending
    RejectedBorrow,  // approval = rejected (terminal)
    Active,          // approved, borrowed, sem pedido de devolução
    ReturnRequested, // approved, borrowed, devolução pendente
    ReturnRejected,  // approved, borrowed, devolução rejeitada (pode pedir de novo)
    Returned,        // returned, devolução aprovada (terminal)
}

impl BorrowingState {
    /// `None` quando a combinação de campos não corresponde a nenhum estado válido.
    pub fn of(borrowing: &Borrowing) -> Option<Self> {
        use ApprovalStatus::*;
        match (borrowing.status, borrowing.approval_status, borrowing.return_approval_status) {
            (BorrowStatus::Borrowed, Pending, None) => Some(Self::Requested),
            (BorrowStatus::Borrowed, Rejected, None) => Some(Self::RejectedBorrow),
            (BorrowStatus::Borrowed, Approved, None) => Some(Self::Active),
            (BorrowStatus::Borrowed, Approved, Some(Pending)) => Some(Self::ReturnRequested),
            (BorrowStatus::Borrowed, Approved, Some(Rejected)) => Some(Self::ReturnRejected),
            (BorrowStatus::Returned, Approved, Some(Approved)) => Some(Self::Returned),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RejectedBorrow | Self::Returned)
    }

    // Uma unidade do item está com o usuário
    pub fn holds_stock(&self) -> bool {
        matches!(self, Self::Active | Self::ReturnRequested | Self::ReturnRejected)
    }
}

impl fmt::Display for BorrowingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Requested => "requested",
            Self::RejectedBorrow => "rejected",
            Self::Active => "active",
            Self::ReturnRequested => "return_requested",
            Self::ReturnRejected => "return_rejected",
            Self::Returned => "returned",
        };
        f.write_str(label)
    }
}

// Texto do estado para mensagens de erro (inclui o caso inconsistente)
pub fn state_label(borrowing: &Borrowing) -> String {
    BorrowingState::of(borrowing)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "inconsistent".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowAction {
    ApproveBorrow,
    RejectBorrow,
    RequestReturn,
    ApproveReturn,
    RejectReturn,
}

impl BorrowAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApproveBorrow => "approve_borrow",
            Self::RejectBorrow => "reject_borrow",
            Self::RequestReturn => "request_return",
            Self::ApproveReturn => "approve_return",
            Self::RejectReturn => "reject_return",
        }
    }

    // Estados a partir dos quais a ação é permitida
    fn allowed_from(&self, state: BorrowingState) -> bool {
        use BorrowingState::*;
        match self {
            Self::ApproveBorrow | Self::RejectBorrow => state == Requested,
            Self::RequestReturn => matches!(state, Active | ReturnRejected),
            Self::ApproveReturn => matches!(state, Active | ReturnRequested | ReturnRejected),
            Self::RejectReturn => state == ReturnRequested,
        }
    }
}

/// Decide a transição para `action`.
///
/// `item_stock` é o estoque lido agora do item do empréstimo (`None` se o
/// item não existe). Só `ApproveBorrow` olha para ele.
pub fn decide(
    action: BorrowAction,
    borrowing: &Borrowing,
    item_stock: Option<i32>,
    now: DateTime<Utc>,
) -> Result<BorrowingTransition, AppError> {
    // 1. O estado atual permite a ação?
    let state = BorrowingState::of(borrowing)
        .filter(|s| action.allowed_from(*s))
        .ok_or_else(|| AppError::InvalidState {
            borrowing_id: borrowing.id,
            action: action.name(),
            state: state_label(borrowing),
        })?;

    let mut transition = BorrowingTransition {
        borrowing_id: borrowing.id,
        expected_version: borrowing.version,
        item_id: borrowing.item_id,
        stock_delta: 0,
        status: borrowing.status,
        approval_status: borrowing.approval_status,
        return_approval_status: borrowing.return_approval_status,
        return_date: borrowing.return_date,
        at: now,
    };

    // 2. Monta os novos campos
    match action {
        BorrowAction::ApproveBorrow => {
            // Reserva de fato acontece aqui, não no pedido
            let stock = item_stock.ok_or_else(|| AppError::not_found(Resource::Item, borrowing.item_id))?;
            if stock <= 0 {
                return Err(AppError::OutOfStock { item_id: borrowing.item_id });
            }
            transition.stock_delta = -1;
            transition.approval_status = ApprovalStatus::Approved;
            transition.status = BorrowStatus::Borrowed;
        }
        BorrowAction::RejectBorrow => {
            transition.approval_status = ApprovalStatus::Rejected;
        }
        BorrowAction::RequestReturn => {
            transition.return_approval_status = Some(ApprovalStatus::Pending);
        }
        BorrowAction::ApproveReturn => {
            debug_assert!(state.holds_stock());
            transition.stock_delta = 1;
            transition.status = BorrowStatus::Returned;
            transition.return_approval_status = Some(ApprovalStatus::Approved);
            transition.return_date = Some(now);
        }
        BorrowAction::RejectReturn => {
            // A unidade continua emprestada: nada a devolver ao estoque
            transition.return_approval_status = Some(ApprovalStatus::Rejected);
        }
    }

    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn requested() -> Borrowing {
        let now = Utc::now();
        Borrowing {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "Ana".into(),
            item_id: Uuid::new_v4(),
            item_code: "LAB-001".into(),
            item_name: "Osciloscópio".into(),
            borrow_date: now,
            return_date: None,
            status: BorrowStatus::Borrowed,
            approval_status: ApprovalStatus::Pending,
            return_approval_status: None,
            notes: None,
            created_at: now,
            updated_at: now,
            version: 3,
        }
    }

    fn in_state(state: BorrowingState) -> Borrowing {
        let mut b = requested();
        match state {
            BorrowingState::Requested => {}
            BorrowingState::RejectedBorrow => b.approval_status = ApprovalStatus::Rejected,
            BorrowingState::Active => b.approval_status = ApprovalStatus::Approved,
            BorrowingState::ReturnRequested => {
                b.approval_status = ApprovalStatus::Approved;
                b.return_approval_status = Some(ApprovalStatus::Pending);
            }
            BorrowingState::ReturnRejected => {
                b.approval_status = ApprovalStatus::Approved;
                b.return_approval_status = Some(ApprovalStatus::Rejected);
            }
            BorrowingState::Returned => {
                b.approval_status = ApprovalStatus::Approved;
                b.status = BorrowStatus::Returned;
                b.return_approval_status = Some(ApprovalStatus::Approved);
                b.return_date = Some(Utc::now());
            }
        }
        assert_eq!(BorrowingState::of(&b), Some(state));
        b
    }

    #[test]
    fn approve_decrements_stock_and_carries_version() {
        let b = requested();
        let t = decide(BorrowAction::ApproveBorrow, &b, Some(1), Utc::now()).unwrap();
        assert_eq!(t.stock_delta, -1);
        assert_eq!(t.approval_status, ApprovalStatus::Approved);
        assert_eq!(t.status, BorrowStatus::Borrowed);
        assert_eq!(t.expected_version, 3);
    }

    #[test]
    fn approve_refused_without_stock() {
        let b = requested();
        let err = decide(BorrowAction::ApproveBorrow, &b, Some(0), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::OutOfStock { .. }));

        let err = decide(BorrowAction::ApproveBorrow, &b, None, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::NotFound { resource: Resource::Item, .. }));
    }

    #[test]
    fn state_is_checked_before_stock() {
        let b = in_state(BorrowingState::Active);
        let err = decide(BorrowAction::ApproveBorrow, &b, Some(0), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState { action: "approve_borrow", .. }));
    }

    #[test]
    fn reject_borrow_only_from_requested() {
        let t = decide(BorrowAction::RejectBorrow, &requested(), None, Utc::now()).unwrap();
        assert_eq!(t.approval_status, ApprovalStatus::Rejected);
        assert_eq!(t.stock_delta, 0);

        for state in [BorrowingState::Active, BorrowingState::RejectedBorrow, BorrowingState::Returned] {
            let err = decide(BorrowAction::RejectBorrow, &in_state(state), None, Utc::now()).unwrap_err();
            assert!(matches!(err, AppError::InvalidState { .. }), "{state}");
        }
    }

    #[test]
    fn return_can_be_requested_again_after_rejection() {
        let t = decide(BorrowAction::RequestReturn, &in_state(BorrowingState::ReturnRejected), None, Utc::now())
            .unwrap();
        assert_eq!(t.return_approval_status, Some(ApprovalStatus::Pending));

        let err = decide(BorrowAction::RequestReturn, &in_state(BorrowingState::ReturnRequested), None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[test]
    fn approve_return_gives_unit_back() {
        let now = Utc::now();
        let t = decide(BorrowAction::ApproveReturn, &in_state(BorrowingState::ReturnRequested), None, now).unwrap();
        assert_eq!(t.stock_delta, 1);
        assert_eq!(t.status, BorrowStatus::Returned);
        assert_eq!(t.return_approval_status, Some(ApprovalStatus::Approved));
        assert_eq!(t.return_date, Some(now));
    }

    #[test]
    fn return_actions_refused_before_approval_and_after_return() {
        for action in [BorrowAction::RequestReturn, BorrowAction::ApproveReturn, BorrowAction::RejectReturn] {
            for state in [BorrowingState::Requested, BorrowingState::RejectedBorrow, BorrowingState::Returned] {
                let err = decide(action, &in_state(state), Some(5), Utc::now()).unwrap_err();
                assert!(matches!(err, AppError::InvalidState { .. }), "{} from {state}", action.name());
            }
        }
    }

    #[test]
    fn reject_return_keeps_unit_checked_out() {
        let t = decide(BorrowAction::RejectReturn, &in_state(BorrowingState::ReturnRequested), None, Utc::now())
            .unwrap();
        assert_eq!(t.stock_delta, 0);
        assert_eq!(t.status, BorrowStatus::Borrowed);
        assert_eq!(t.return_approval_status, Some(ApprovalStatus::Rejected));
    }

    #[test]
    fn reject_return_needs_a_pending_request() {
        // null -> rejected não existe: só se rejeita o que foi pedido
        for state in [BorrowingState::Active, BorrowingState::ReturnRejected] {
            let err = decide(BorrowAction::RejectReturn, &in_state(state), None, Utc::now()).unwrap_err();
            assert!(matches!(err, AppError::InvalidState { action: "reject_return", .. }), "{state}");
        }
    }

    #[test]
    fn terminal_states_accept_no_action() {
        let actions = [
            BorrowAction::ApproveBorrow,
            BorrowAction::RejectBorrow,
            BorrowAction::RequestReturn,
            BorrowAction::ApproveReturn,
            BorrowAction::RejectReturn,
        ];
        for state in [BorrowingState::RejectedBorrow, BorrowingState::Returned] {
            assert!(state.is_terminal());
            assert!(!state.holds_stock());
            for action in actions {
                assert!(decide(action, &in_state(state), Some(1), Utc::now()).is_err());
            }
        }
    }

    #[test]
    fn inconsistent_record_is_refused() {
        let mut b = requested();
        b.status = BorrowStatus::Returned; // devolvido sem nunca ter sido aprovado
        assert_eq!(BorrowingState::of(&b), None);
        let err = decide(BorrowAction::ApproveBorrow, &b, Some(1), Utc::now()).unwrap_err();
        match err {
            AppError::InvalidState { state, .. } => assert_eq!(state, "inconsistent"),
            other => panic!("esperava InvalidState, veio {other:?}"),
        }
    }

    #[test]
    fn net_stock_delta_over_full_lifecycle_is_zero() {
        let mut b = requested();
        let mut net = 0;
        for action in [
            BorrowAction::ApproveBorrow,
            BorrowAction::RequestReturn,
            BorrowAction::RejectReturn,
            BorrowAction::RequestReturn,
            BorrowAction::ApproveReturn,
        ] {
            let t = decide(action, &b, Some(1), Utc::now()).unwrap();
            net += t.stock_delta;
            t.apply_to(&mut b);
            if action == BorrowAction::ApproveBorrow {
                assert_eq!(net, -1);
            }
        }
        assert_eq!(net, 0);
        assert_eq!(BorrowingState::of(&b), Some(BorrowingState::Returned));
    }
}
