//! Single-shot order commands.
//!
//! # Usage
//!
//! ```bash
//! po-feed list --cursor 20 --limit 10
//! po-feed show 42
//! po-feed create --item-name "Hex bolts" --order-date 2024-05-01 \
//!     --delivery-date 2024-05-08 --quantity 200 --unit-price 0.15
//! po-feed delete 42
//! ```

use purchase_feed::{DataSource, DeleteOutcome};
use purchase_feed_core::{Cursor, NewPurchaseOrder, OrderId};

use super::{CliError, connect, format_row};

/// Print one page.
pub async fn list(cursor: Option<Cursor>, limit: Option<u32>) -> Result<(), CliError> {
    let session = connect()?;
    let limit = limit.unwrap_or(session.config().page_size);
    if limit == 0 || limit > 100 {
        return Err(CliError::InvalidArgument(
            "limit",
            format!("must be between 1 and 100 (got {limit})"),
        ));
    }

    let page = session.source().fetch_page(cursor.as_ref(), limit).await?;
    for order in &page.items {
        println!("{}", format_row(order));
    }

    match page.next_cursor {
        Some(ref next) if page.has_more => println!("-- {} orders, next cursor: {next}", page.len()),
        _ => println!("-- {} orders, end of list", page.len()),
    }
    Ok(())
}

/// Print a single order.
pub async fn show(id: OrderId) -> Result<(), CliError> {
    let session = connect()?;
    let order = session.fetch_order(id).await?;
    println!("{}", format_row(&order));
    Ok(())
}

/// Create an order and print the stored record.
pub async fn create(draft: NewPurchaseOrder) -> Result<(), CliError> {
    if draft.quantity == 0 {
        return Err(CliError::InvalidArgument(
            "quantity",
            "must be positive".to_string(),
        ));
    }
    if draft.delivery_date < draft.order_date {
        return Err(CliError::InvalidArgument(
            "delivery_date",
            format!("{} is before order date {}", draft.delivery_date, draft.order_date),
        ));
    }

    let session = connect()?;
    let order = session.create(draft).await?;
    println!("Created:");
    println!("{}", format_row(&order));
    Ok(())
}

/// Delete an order.
pub async fn delete(id: OrderId) -> Result<(), CliError> {
    let session = connect()?;
    match session.delete(id).await? {
        DeleteOutcome::Deleted => println!("Deleted purchase order {id}"),
        DeleteOutcome::AlreadyPending => println!("Delete of {id} already in progress"),
    }
    Ok(())
}
