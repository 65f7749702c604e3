//! Invoice store.

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{money, InvoiceId, InvoiceRecord, NewInvoice, UserId};

/// Inserts an invoice. `None` on duplicate number, unknown user, an amount that
/// does not fit, or an unavailable store.
pub fn create_invoice(pool: &DbPool, invoice: &NewInvoice) -> Option<InvoiceId> {
    insert_invoice(pool, invoice)
        .inspect_err(|e| e.log("create_invoice"))
        .ok()
}

/// Lists a user's invoices, newest invoice date first; same-date invoices come
/// most recently created first.
///
/// A failed lookup is logged and reported as an empty list, so callers cannot
/// tell "no invoices" from "store error".
pub fn list_invoices(pool: &DbPool, user_id: UserId) -> Vec<InvoiceRecord> {
    select_invoices(pool, user_id)
        .inspect_err(|e| e.log("list_invoices"))
        .unwrap_or_default()
}

fn cents(amount: rust_decimal::Decimal, field: &str) -> AppResult<i64> {
    money::to_minor_units(amount)
        .ok_or_else(|| AppError::BadRequest(format!("{field} is out of range")))
}

fn insert_invoice(pool: &DbPool, invoice: &NewInvoice) -> AppResult<InvoiceId> {
    let subtotal = cents(invoice.subtotal, "subtotal")?;
    let tax = cents(invoice.tax, "tax")?;
    let total = cents(invoice.total, "total")?;

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO invoices (invoice_number, user_id, invoice_date, due_date, subtotal, tax, total, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            invoice.invoice_number,
            invoice.user_id,
            invoice.invoice_date,
            invoice.due_date,
            subtotal,
            tax,
            total,
            invoice.status
        ],
    )
    .map_err(|e| AppError::from_constraint(e, "An invoice with this number"))?;

    let invoice_id = conn.last_insert_rowid();
    tracing::info!(invoice_id, user_id = invoice.user_id, "Created invoice");
    Ok(invoice_id)
}

fn select_invoices(pool: &DbPool, user_id: UserId) -> AppResult<Vec<InvoiceRecord>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT invoice_number, invoice_date, due_date, subtotal, tax, total, status
         FROM invoices
         WHERE user_id = ?1
         ORDER BY invoice_date DESC, id DESC",
    )?;

    let rows = stmt.query_map(rusqlite::params![user_id], |row| {
        Ok(InvoiceRecord {
            invoice_number: row.get(0)?,
            invoice_date: row.get(1)?,
            due_date: row.get(2)?,
            subtotal: money::from_minor_units(row.get(3)?),
            tax: money::from_minor_units(row.get(4)?),
            total: money::from_minor_units(row.get(5)?),
            status: row.get(6)?,
        })
    })?;
    let data: Result<Vec<_>, _> = rows.collect();

    Ok(data?)
}
