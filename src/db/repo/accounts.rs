//! Account, movement and balance reconciliation operations for the repository.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashMap;
use tracing::warn;

use super::{date, date_col, dec, decimal_col, opt_string_col, Repository};
use crate::domain::{
    new_record_id, Account, AccountKind, AccountMovement, BalanceDrift, Decimal, MovementKind,
};

const MOVEMENT_COLUMNS: &str = "id, account_id, date, amount, kind, description";

fn account_from_row(row: &SqliteRow) -> Account {
    Account {
        id: row.get("id"),
        name: row.get("name"),
        balance: decimal_col(row, "balance"),
        kind: AccountKind::parse(&row.get::<String, _>("kind")),
        is_principal: row.get::<i64, _>("is_principal") != 0,
    }
}

fn movement_from_row(row: &SqliteRow) -> AccountMovement {
    AccountMovement {
        id: row.get("id"),
        account_id: row.get("account_id"),
        date: date_col(row, "date"),
        amount: decimal_col(row, "amount"),
        kind: MovementKind::parse(&row.get::<String, _>("kind")),
        description: opt_string_col(row, "description"),
    }
}

impl Repository {
    // =========================================================================
    // Accounts
    // =========================================================================

    /// Create an account. A non-zero starting balance is recorded as an
    /// `opening` movement dated `opened_on`, so the cached balance always
    /// equals the sum of the account's movements.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_account(
        &self,
        account: &Account,
        opened_on: NaiveDate,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO accounts (id, name, balance, kind, is_principal) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(account.id.as_str())
        .bind(account.name.as_str())
        .bind(dec(&account.balance))
        .bind(account.kind.as_str())
        .bind(account.is_principal as i64)
        .execute(&mut *tx)
        .await?;

        if !account.balance.is_zero() {
            sqlx::query(
                "INSERT INTO account_movements (id, account_id, date, amount, kind, description) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(new_record_id())
            .bind(account.id.as_str())
            .bind(date(opened_on))
            .bind(dec(&account.balance))
            .bind(MovementKind::Opening.as_str())
            .bind(Option::<String>::None)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_account(&self, id: &str) -> Result<Option<Account>, sqlx::Error> {
        let row = sqlx::query("SELECT id, name, balance, kind, is_principal FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(account_from_row))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, name, balance, kind, is_principal FROM accounts ORDER BY is_principal DESC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(account_from_row).collect())
    }

    // =========================================================================
    // Movements
    // =========================================================================

    /// Append a movement and apply it to the cached account balance atomically.
    ///
    /// Returns the new balance, or `None` if the account does not exist.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_movement(
        &self,
        movement: &AccountMovement,
    ) -> Result<Option<Decimal>, sqlx::Error> {
        self.insert_movements(std::slice::from_ref(movement)).await
    }

    /// Append several movements in one transaction, applying each to its
    /// account's cached balance. Either all of them commit or none do.
    ///
    /// Returns the balance of the last movement's account after the batch, or
    /// `None` (and writes nothing) if any movement names a missing account.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_movements(
        &self,
        movements: &[AccountMovement],
    ) -> Result<Option<Decimal>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut balance = None;

        for movement in movements {
            // Writing the row before reading it takes SQLite's write lock, so
            // the balance read below cannot go stale before the update.
            let claimed = sqlx::query("UPDATE accounts SET balance = balance WHERE id = ?")
                .bind(movement.account_id.as_str())
                .execute(&mut *tx)
                .await?;
            if claimed.rows_affected() == 0 {
                return Ok(None);
            }

            let row = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
                .bind(movement.account_id.as_str())
                .fetch_one(&mut *tx)
                .await?;
            let new_balance = decimal_col(&row, "balance") + movement.amount;

            sqlx::query(
                "INSERT INTO account_movements (id, account_id, date, amount, kind, description) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(movement.id.as_str())
            .bind(movement.account_id.as_str())
            .bind(date(movement.date))
            .bind(dec(&movement.amount))
            .bind(movement.kind.as_str())
            .bind(movement.description.as_deref())
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
                .bind(dec(&new_balance))
                .bind(movement.account_id.as_str())
                .execute(&mut *tx)
                .await?;
            balance = Some(new_balance);
        }

        tx.commit().await?;
        Ok(balance)
    }

    pub async fn list_movements(&self) -> Result<Vec<AccountMovement>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM account_movements ORDER BY date ASC, id ASC",
            MOVEMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(movement_from_row).collect())
    }

    pub async fn query_movements_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<AccountMovement>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM account_movements WHERE account_id = ? ORDER BY date ASC, id ASC",
            MOVEMENT_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(movement_from_row).collect())
    }

    /// Movements dated on or after `from`, across all accounts.
    pub async fn query_movements_since(
        &self,
        from: NaiveDate,
    ) -> Result<Vec<AccountMovement>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM account_movements WHERE date >= ? ORDER BY date ASC, id ASC",
            MOVEMENT_COLUMNS
        ))
        .bind(date(from))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(movement_from_row).collect())
    }

    /// Recompute each account's balance from its movements and repair drifted caches.
    ///
    /// Reads and repairs share one transaction that holds the write lock from
    /// its first statement, so a movement cannot commit in between.
    ///
    /// # Errors
    /// Returns an error if a query or the repair transaction fails.
    pub async fn reconcile_account_balances(&self) -> Result<Vec<BalanceDrift>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE accounts SET balance = balance")
            .execute(&mut *tx)
            .await?;

        let accounts: Vec<Account> = sqlx::query(
            "SELECT id, name, balance, kind, is_principal FROM accounts ORDER BY is_principal DESC, name ASC",
        )
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(account_from_row)
        .collect();
        let mut derived: HashMap<String, Decimal> = HashMap::new();
        for row in sqlx::query("SELECT account_id, amount FROM account_movements")
            .fetch_all(&mut *tx)
            .await?
        {
            *derived.entry(row.get("account_id")).or_default() += decimal_col(&row, "amount");
        }

        let drifts: Vec<BalanceDrift> = accounts
            .into_iter()
            .filter_map(|account| {
                let ledger = derived.get(&account.id).copied().unwrap_or_default();
                (ledger != account.balance).then(|| BalanceDrift {
                    account_id: account.id,
                    cached: account.balance,
                    derived: ledger,
                })
            })
            .collect();

        for drift in &drifts {
            warn!(
                account_id = %drift.account_id,
                cached = %drift.cached,
                derived = %drift.derived,
                "Account balance drifted from movement ledger, repairing"
            );
            sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
                .bind(dec(&drift.derived))
                .bind(drift.account_id.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(drifts)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::repo::test_support::setup_repo;
    use crate::domain::{Account, AccountKind, AccountMovement, Decimal, MovementKind};
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn day(y: i32, m: u32, dd: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, dd).unwrap()
    }

    fn account(id: &str, balance: &str) -> Account {
        Account {
            id: id.to_string(),
            name: id.to_string(),
            balance: d(balance),
            kind: AccountKind::Remunerated,
            is_principal: true,
        }
    }

    fn movement(id: &str, account_id: &str, amount: &str, date: NaiveDate) -> AccountMovement {
        AccountMovement {
            id: id.to_string(),
            account_id: account_id.to_string(),
            date,
            amount: d(amount),
            kind: MovementKind::Deposit,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_opening_balance_becomes_movement() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_account(&account("a", "1000"), day(2024, 1, 1))
            .await
            .unwrap();

        let movements = repo.query_movements_for_account("a").await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Opening);
        assert_eq!(movements[0].amount, d("1000"));
    }

    #[tokio::test]
    async fn test_insert_movement_updates_cached_balance() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_account(&account("a", "1000"), day(2024, 1, 1))
            .await
            .unwrap();

        let balance = repo
            .insert_movement(&movement("m1", "a", "-250.5", day(2024, 2, 1)))
            .await
            .unwrap();
        assert_eq!(balance, Some(d("749.5")));

        let loaded = repo.get_account("a").await.unwrap().unwrap();
        assert_eq!(loaded.balance, d("749.5"));
    }

    #[tokio::test]
    async fn test_movement_for_missing_account() {
        let (repo, _temp) = setup_repo().await;
        let balance = repo
            .insert_movement(&movement("m1", "ghost", "10", day(2024, 2, 1)))
            .await
            .unwrap();
        assert_eq!(balance, None);
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drift() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_account(&account("a", "100"), day(2024, 1, 1))
            .await
            .unwrap();
        repo.insert_account(&account("b", "50"), day(2024, 1, 1))
            .await
            .unwrap();
        sqlx::query("UPDATE accounts SET balance = '999' WHERE id = 'a'")
            .execute(repo.pool())
            .await
            .unwrap();

        let drifts = repo.reconcile_account_balances().await.unwrap();
        assert_eq!(drifts.len(), 1);
        assert_eq!(drifts[0].account_id, "a");
        assert_eq!(drifts[0].cached, d("999"));
        assert_eq!(drifts[0].derived, d("100"));

        let repaired = repo.get_account("a").await.unwrap().unwrap();
        assert_eq!(repaired.balance, d("100"));
        assert!(repo.reconcile_account_balances().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_movement_batch_is_all_or_nothing() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_account(&account("a", "100"), day(2024, 1, 1))
            .await
            .unwrap();

        let batch = [
            movement("m1", "a", "-40", day(2024, 2, 1)),
            movement("m2", "a", "2", day(2024, 2, 1)),
        ];
        assert_eq!(repo.insert_movements(&batch).await.unwrap(), Some(d("62")));

        // A duplicate id fails the second insert; the first must roll back.
        let failing = [
            movement("m3", "a", "-10", day(2024, 3, 1)),
            movement("m1", "a", "5", day(2024, 3, 1)),
        ];
        assert!(repo.insert_movements(&failing).await.is_err());
        let ghost = [
            movement("m4", "a", "-10", day(2024, 3, 1)),
            movement("m5", "ghost", "5", day(2024, 3, 1)),
        ];
        assert_eq!(repo.insert_movements(&ghost).await.unwrap(), None);

        let loaded = repo.get_account("a").await.unwrap().unwrap();
        assert_eq!(loaded.balance, d("62"));
        assert_eq!(repo.query_movements_for_account("a").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reconcile_concurrent_with_movements_leaves_no_drift() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_account(&account("a", "100"), day(2024, 1, 1))
            .await
            .unwrap();

        for round in 0..10 {
            sqlx::query("UPDATE accounts SET balance = '999' WHERE id = 'a'")
                .execute(repo.pool())
                .await
                .unwrap();

            let writer = {
                let repo = repo.clone();
                tokio::spawn(async move {
                    for i in 0..5 {
                        let id = format!("m{}-{}", round, i);
                        repo.insert_movement(&movement(&id, "a", "1", day(2024, 2, 1)))
                            .await
                            .unwrap();
                    }
                })
            };
            let reconciler = {
                let repo = repo.clone();
                tokio::spawn(async move { repo.reconcile_account_balances().await.unwrap() })
            };
            writer.await.unwrap();
            reconciler.await.unwrap();

            // Whichever ran first, the cache must match the movement ledger.
            assert!(repo.reconcile_account_balances().await.unwrap().is_empty());
        }

        let movements = repo.query_movements_for_account("a").await.unwrap();
        let derived: Decimal = movements.iter().map(|m| m.amount).sum();
        assert_eq!(derived, d("150"));
        assert_eq!(repo.get_account("a").await.unwrap().unwrap().balance, derived);
    }

    #[tokio::test]
    async fn test_movements_since_filters_by_date() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_account(&account("a", "0"), day(2024, 1, 1))
            .await
            .unwrap();
        repo.insert_movement(&movement("m1", "a", "10", day(2024, 4, 30)))
            .await
            .unwrap();
        repo.insert_movement(&movement("m2", "a", "10", day(2024, 5, 1)))
            .await
            .unwrap();

        let since = repo.query_movements_since(day(2024, 5, 1)).await.unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].id, "m2");
    }
}
