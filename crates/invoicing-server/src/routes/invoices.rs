use std::str::FromStr;

use axum::{
    extract::State,
    http::Uri,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::form::FormFields;
use super::AppState;
use crate::auth::session::SessionUser;
use crate::error::{AppError, AppResult};
use crate::models::{InvoiceId, InvoiceRecord, NewInvoice, UserId, DEFAULT_INVOICE_STATUS};
use crate::services::invoices;

#[derive(Debug, Default)]
pub struct CreateInvoiceForm {
    pub user_id: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub subtotal: Option<String>,
    pub tax: Option<String>,
    pub total: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceCreated {
    pub ok: bool,
    pub invoice_id: InvoiceId,
}

#[derive(Debug, Serialize)]
pub struct InvoiceList {
    pub ok: bool,
    pub invoices: Vec<InvoiceRecord>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// An explicit id wins over the session; an empty one counts as absent.
fn resolve_user_id(explicit: Option<String>, session: Option<&SessionUser>) -> AppResult<Option<UserId>> {
    match present(explicit) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest("invalid user_id".into())),
        None => Ok(session.map(|s| s.user_id)),
    }
}

fn parse_date(raw: &str, field: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid {field}")))
}

fn parse_amount(raw: &str, field: &str) -> AppResult<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| AppError::BadRequest(format!("invalid {field}")))
}

impl From<FormFields> for CreateInvoiceForm {
    fn from(mut fields: FormFields) -> Self {
        Self {
            user_id: fields.take("user_id"),
            invoice_number: fields.take("invoice_number"),
            invoice_date: fields.take("invoice_date"),
            due_date: fields.take("due_date"),
            subtotal: fields.take("subtotal"),
            tax: fields.take("tax"),
            total: fields.take("total"),
            status: fields.take("status"),
        }
    }
}

impl CreateInvoiceForm {
    fn into_new_invoice(self, session: Option<&SessionUser>) -> AppResult<NewInvoice> {
        let user_id = resolve_user_id(self.user_id, session)?;
        let (
            Some(user_id),
            Some(invoice_number),
            Some(invoice_date),
            Some(due_date),
            Some(subtotal),
            Some(tax),
            Some(total),
        ) = (
            user_id,
            present(self.invoice_number),
            present(self.invoice_date),
            present(self.due_date),
            present(self.subtotal),
            present(self.tax),
            present(self.total),
        )
        else {
            return Err(AppError::BadRequest("missing fields".into()));
        };

        Ok(NewInvoice {
            user_id,
            invoice_number,
            invoice_date: parse_date(&invoice_date, "invoice_date")?,
            due_date: parse_date(&due_date, "due_date")?,
            subtotal: parse_amount(&subtotal, "subtotal")?,
            tax: parse_amount(&tax, "tax")?,
            total: parse_amount(&total, "total")?,
            status: self
                .status
                .unwrap_or_else(|| DEFAULT_INVOICE_STATUS.to_string()),
        })
    }
}

/// POST /invoice
pub async fn create(
    State(state): State<AppState>,
    session: Option<SessionUser>,
    fields: FormFields,
) -> AppResult<Json<InvoiceCreated>> {
    let new_invoice = CreateInvoiceForm::from(fields).into_new_invoice(session.as_ref())?;

    let invoice_id = invoices::create_invoice(&state.db, &new_invoice)
        .ok_or_else(|| AppError::Internal("invoice could not be created".into()))?;

    Ok(Json(InvoiceCreated {
        ok: true,
        invoice_id,
    }))
}

/// GET /invoices
pub async fn list(
    State(state): State<AppState>,
    session: Option<SessionUser>,
    uri: Uri,
) -> AppResult<Json<InvoiceList>> {
    let mut query = FormFields::from_query(uri.query());
    let user_id = resolve_user_id(query.take("user_id"), session.as_ref())?
        .ok_or_else(|| AppError::BadRequest("user_id required".into()))?;

    Ok(Json(InvoiceList {
        ok: true,
        invoices: invoices::list_invoices(&state.db, user_id),
    }))
}
