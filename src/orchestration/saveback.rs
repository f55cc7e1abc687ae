use crate::domain::{new_record_id, Account, AccountMovement, Decimal, MovementKind};

/// Pending saveback credit derived from a card expense on the principal
/// account, or `None` when the movement does not qualify.
pub fn saveback_for(
    account: &Account,
    movement: &AccountMovement,
    pct: Decimal,
) -> Option<AccountMovement> {
    if !account.is_principal || movement.kind != MovementKind::CardExpense || !pct.is_positive() {
        return None;
    }
    let credit = (movement.amount.abs() * pct).checked_ratio(Decimal::hundred());
    if credit.is_zero() {
        return None;
    }
    Some(AccountMovement {
        id: new_record_id(),
        account_id: account.id.clone(),
        date: movement.date,
        amount: MovementKind::PendingSaveback.signed(credit),
        kind: MovementKind::PendingSaveback,
        description: Some(format!("saveback {}", movement.id)),
    })
}
