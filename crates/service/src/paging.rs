//! Shared helpers turning sea-orm selects into `Page` envelopes.

use common::pagination::{Page, Pagination, SortDirection};
use sea_orm::{ConnectionTrait, ItemsAndPagesNumber, Order, PaginatorTrait, SelectorTrait};

use crate::errors::ServiceError;

pub(crate) fn order_of(direction: SortDirection) -> Order {
    match direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    }
}

/// Run a select as one page: totals first, then the rows of the requested
/// page. A page index past the end yields an empty item list.
pub(crate) async fn to_page<'db, C, P>(
    db: &'db C,
    query: P,
    opts: Pagination,
) -> Result<Page<<P::Selector as SelectorTrait>::Item>, ServiceError>
where
    C: ConnectionTrait,
    P: PaginatorTrait<'db, C>,
{
    let (page_idx, per_page) = opts.normalize();
    let paginator = query.paginate(db, per_page);
    let ItemsAndPagesNumber { number_of_items, number_of_pages } =
        paginator.num_items_and_pages().await.map_err(ServiceError::db)?;
    let items = paginator.fetch_page(page_idx).await.map_err(ServiceError::db)?;
    Ok(Page::new(items, page_idx + 1, per_page, number_of_items, number_of_pages))
}
