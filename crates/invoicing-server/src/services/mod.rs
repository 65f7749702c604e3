pub mod invoices;
pub mod users;
