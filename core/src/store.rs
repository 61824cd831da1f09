//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! Everything it returns has passed through the ingest seam.

use crate::{
    error::{AuditError, AuditResult},
    ingest::{self, RawPaymentRow},
    provider::{DataProvider, EntityLoad},
    types::{ClientId, ContractId, EntityKey, EntityRecord, PaymentEvent, PaymentId},
};
use rusqlite::{params, types::Value, Connection, Row};
use std::collections::BTreeMap;

pub struct LedgerStore {
    conn: Connection,
}

/// Contract fields needed to seed a ledger.
#[derive(Debug, Clone, Default)]
pub struct NewContract {
    pub client_id: ClientId,
    pub provider_name: Option<String>,
    pub payment_schedule: Option<String>,
    pub fee_type: Option<String>,
    pub percent_rate: Option<f64>,
    pub flat_rate: Option<f64>,
}

/// A well-formed payment to seed.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub client_id: ClientId,
    pub contract_id: ContractId,
    pub received_date: String,
    pub actual_fee: f64,
    pub total_assets: Option<f64>,
}

impl LedgerStore {
    pub fn open(path: &str) -> AuditResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AuditResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AuditResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_ledger.sql"))?;
        Ok(())
    }

    /// Run `f` inside one transaction; rolled back if it fails.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> AuditResult<T>) -> AuditResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    // ── Seeding ────────────────────────────────────────────────

    pub fn insert_client(&self, display_name: &str) -> AuditResult<ClientId> {
        self.conn.execute(
            "INSERT INTO clients (display_name) VALUES (?1)",
            params![display_name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_contract(&self, c: &NewContract) -> AuditResult<ContractId> {
        self.conn.execute(
            "INSERT INTO contracts
             (client_id, provider_name, payment_schedule, fee_type, percent_rate, flat_rate)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                c.client_id,
                c.provider_name,
                c.payment_schedule,
                c.fee_type,
                c.percent_rate,
                c.flat_rate,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_payment(&self, p: &NewPayment) -> AuditResult<PaymentId> {
        self.insert_payment_raw(
            p.client_id,
            p.contract_id,
            Value::Text(p.received_date.clone()),
            Value::Real(p.actual_fee),
            p.total_assets.map_or(Value::Null, Value::Real),
        )
    }

    /// Insert a payment with arbitrary column values, as legacy rows have.
    pub fn insert_payment_raw(
        &self,
        client_id: ClientId,
        contract_id: ContractId,
        received_date: Value,
        actual_fee: Value,
        total_assets: Value,
    ) -> AuditResult<PaymentId> {
        self.conn.execute(
            "INSERT INTO payments (client_id, contract_id, received_date, actual_fee, total_assets)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![client_id, contract_id, received_date, actual_fee, total_assets],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Soft-delete a payment.
    pub fn retire_payment(&self, payment_id: PaymentId) -> AuditResult<()> {
        self.conn.execute(
            "UPDATE payments SET valid_to = CURRENT_TIMESTAMP
             WHERE payment_id = ?1 AND valid_to IS NULL",
            params![payment_id],
        )?;
        Ok(())
    }

    pub fn deactivate_contract(&self, contract_id: ContractId) -> AuditResult<()> {
        self.conn.execute(
            "UPDATE contracts SET is_active = 0 WHERE contract_id = ?1",
            params![contract_id],
        )?;
        Ok(())
    }

    pub fn current_payment_count(&self) -> AuditResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM payments WHERE valid_to IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    // ── Reads ──────────────────────────────────────────────────

    fn map_entity_row(row: &Row<'_>) -> rusqlite::Result<EntityRecord> {
        let client_id: ClientId = row.get(0)?;
        let contract_id: ContractId = row.get(2)?;
        let schedule: Option<String> = row.get(4)?;
        let fee_type: Option<String> = row.get(5)?;
        let percent_rate: Value = row.get(6)?;
        let flat_rate: Value = row.get(7)?;

        let recorded_fee_model = ingest::parse_recorded_fee_model(fee_type.as_deref());
        Ok(EntityRecord {
            key: EntityKey::new(client_id, contract_id),
            label: row.get(1)?,
            provider_name: row.get(3)?,
            recorded_schedule: ingest::parse_recorded_schedule(schedule.as_deref()),
            recorded_fee_model,
            recorded_rate: ingest::recorded_rate(recorded_fee_model, &percent_rate, &flat_rate),
        })
    }

    fn map_payment_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<RawPaymentRow> {
        Ok(RawPaymentRow {
            payment_id: row.get(offset)?,
            received_date: row.get(offset + 1)?,
            actual_fee: row.get(offset + 2)?,
            total_assets: row.get(offset + 3)?,
        })
    }

    /// One query for every current payment of every active entity.
    fn bulk_events(&self) -> AuditResult<BTreeMap<EntityKey, Vec<PaymentEvent>>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.client_id, p.contract_id,
                    p.payment_id, p.received_date, p.actual_fee, p.total_assets
             FROM payments p
             JOIN contracts co ON co.contract_id = p.contract_id
             WHERE p.valid_to IS NULL AND co.valid_to IS NULL AND co.is_active = 1
             ORDER BY p.client_id, p.contract_id, p.received_date, p.payment_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let key = EntityKey::new(row.get(0)?, row.get(1)?);
                Ok((key, Self::map_payment_row(row, 2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut grouped: BTreeMap<EntityKey, Vec<PaymentEvent>> = BTreeMap::new();
        for (key, raw) in rows {
            grouped.entry(key).or_default().push(raw.to_event(key));
        }
        Ok(grouped)
    }
}

impl DataProvider for LedgerStore {
    fn list_active_entities(&self) -> AuditResult<Vec<EntityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.client_id, c.display_name, co.contract_id, co.provider_name,
                    co.payment_schedule, co.fee_type, co.percent_rate, co.flat_rate
             FROM clients c
             JOIN contracts co ON c.client_id = co.client_id
             WHERE c.valid_to IS NULL AND co.valid_to IS NULL AND co.is_active = 1
             ORDER BY c.display_name, co.contract_id",
        )?;
        let entities = stmt
            .query_map([], |row| Self::map_entity_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    fn get_events(&self, key: EntityKey) -> AuditResult<Vec<PaymentEvent>> {
        let read = || -> rusqlite::Result<Vec<RawPaymentRow>> {
            let mut stmt = self.conn.prepare(
                "SELECT payment_id, received_date, actual_fee, total_assets
                 FROM payments
                 WHERE client_id = ?1 AND contract_id = ?2 AND valid_to IS NULL
                 ORDER BY received_date, payment_id",
            )?;
            let rows = stmt
                .query_map(params![key.client_id, key.contract_id], |row| {
                    Self::map_payment_row(row, 0)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        };
        let rows = read().map_err(|e| AuditError::DataAccess {
            entity: key,
            reason: e.to_string(),
        })?;
        Ok(rows.iter().map(|raw| raw.to_event(key)).collect())
    }

    fn load_histories(&self) -> AuditResult<Vec<EntityLoad>> {
        let entities = self.list_active_entities()?;

        match self.bulk_events() {
            Ok(mut grouped) => Ok(entities
                .into_iter()
                .map(|entity| {
                    let events = grouped.remove(&entity.key).unwrap_or_default();
                    EntityLoad {
                        entity,
                        events: Ok(events),
                    }
                })
                .collect()),
            Err(e) => {
                log::warn!("bulk payment read failed ({e}); falling back to per-entity reads");
                Ok(entities
                    .into_iter()
                    .map(|entity| {
                        let events = self.get_events(entity.key);
                        EntityLoad { entity, events }
                    })
                    .collect())
            }
        }
    }
}
