use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::constants::{DEFAULT_PAGE_SIZE, PAGE_SIZE_CHOICES};
use crate::models::records::MergedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    Pending,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscrepancyFilter {
    All,
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JourneyFilter {
    All,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    VehicleAsc,
    VehicleDesc,
    DateAsc,
    DateDesc,
}

/// Filter dimensions over the merged day view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    pub discrepancy: DiscrepancyFilter,
    pub status: StatusFilter,
    pub journey: JourneyFilter,
    pub sort: SortOrder,
}

impl Default for FilterState {
    /// Operator landing view: pending vehicles first, sorted by number.
    fn default() -> Self {
        Self {
            search: String::new(),
            discrepancy: DiscrepancyFilter::All,
            status: StatusFilter::Pending,
            journey: JourneyFilter::All,
            sort: SortOrder::VehicleAsc,
        }
    }
}

/// The whole serializable listing state owned by the workflow: filters plus
/// the pagination window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListState {
    pub filters: FilterState,
    pub page: u32,
    pub page_size: u32,
}

impl ListState {
    pub fn new(page_size: u32) -> Self {
        Self {
            filters: FilterState::default(),
            page: 1,
            page_size,
        }
    }
}

impl Default for ListState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// Listing mutations. Every filter change snaps back to page 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListAction {
    SetSearch(String),
    SetDiscrepancy(DiscrepancyFilter),
    SetStatus(StatusFilter),
    SetJourney(JourneyFilter),
    SetSort(SortOrder),
    SetPage(u32),
    SetPageSize(u32),
    ClearFilters,
}

/// Pure listing-state reducer.
///
/// `SetPage` accepts any page >= 1, including pages past the end; the
/// pipeline reports totals and navigation is clamped by the caller, never
/// here. An unsupported page size leaves the state untouched.
pub fn reduce(state: &ListState, action: ListAction) -> ListState {
    let mut next = state.clone();
    match action {
        ListAction::SetSearch(search) => {
            next.filters.search = search;
            next.page = 1;
        }
        ListAction::SetDiscrepancy(discrepancy) => {
            next.filters.discrepancy = discrepancy;
            next.page = 1;
        }
        ListAction::SetStatus(status) => {
            next.filters.status = status;
            next.page = 1;
        }
        ListAction::SetJourney(journey) => {
            next.filters.journey = journey;
            next.page = 1;
        }
        ListAction::SetSort(sort) => {
            next.filters.sort = sort;
            next.page = 1;
        }
        ListAction::SetPage(page) => {
            next.page = page.max(1);
        }
        ListAction::SetPageSize(size) => {
            if PAGE_SIZE_CHOICES.contains(&size) {
                next.page_size = size;
                next.page = 1;
            }
        }
        ListAction::ClearFilters => {
            next.filters = FilterState::default();
            next.page = 1;
        }
    }
    next
}

/// One rendered page of the filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<MergedItem>,
    /// Size of the filtered list before slicing
    pub total: usize,
}

/// Pages needed for `total` items, at least 1 (an empty list still renders
/// page 1 of 1).
pub fn total_pages(total: usize, page_size: u32) -> u32 {
    let size = page_size.max(1) as usize;
    (((total + size - 1) / size) as u32).max(1)
}

/// Whether a next page exists; drives the caller-side navigation clamp.
pub fn has_next_page(page: u32, total: usize, page_size: u32) -> bool {
    page < total_pages(total, page_size)
}

/// Apply filters, sort and pagination to the merged view.
///
/// Pure: same inputs, same page. The page window is
/// `[(page-1)*page_size, page*page_size)`; a page past the end yields an
/// empty item list with the total unchanged.
pub fn apply(items: &[MergedItem], state: &ListState) -> Page {
    let needle = state.filters.search.trim().to_lowercase();
    let mut filtered: Vec<&MergedItem> = items
        .iter()
        .filter(|item| matches_search(item, &needle))
        .filter(|item| matches_status(item, state.filters.status))
        .filter(|item| matches_discrepancy(item, state.filters.discrepancy))
        .filter(|item| matches_journey(item, state.filters.journey))
        .collect();

    sort_items(&mut filtered, state.filters.sort);

    let total = filtered.len();
    let start = (state.page.saturating_sub(1) as usize) * state.page_size as usize;
    let page_items = filtered
        .into_iter()
        .skip(start)
        .take(state.page_size as usize)
        .cloned()
        .collect();

    Page {
        items: page_items,
        total,
    }
}

fn matches_search(item: &MergedItem, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [
        item.vehicle_plate(),
        item.vehicle_number(),
        item.company_name(),
        item.operator_name(),
    ]
    .iter()
    .any(|haystack| haystack.to_lowercase().contains(needle))
}

fn matches_status(item: &MergedItem, status: StatusFilter) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Pending => !item.is_done(),
        StatusFilter::Done => item.is_done(),
    }
}

fn matches_discrepancy(item: &MergedItem, filter: DiscrepancyFilter) -> bool {
    match filter {
        DiscrepancyFilter::All => true,
        // Only done items with both channels counted can answer either way
        DiscrepancyFilter::Yes => item.discrepancy() == Some(true),
        DiscrepancyFilter::No => item.discrepancy() == Some(false),
    }
}

fn matches_journey(item: &MergedItem, filter: JourneyFilter) -> bool {
    match filter {
        JourneyFilter::All => true,
        JourneyFilter::Open => item.journey_closed() == Some(false),
        JourneyFilter::Closed => item.journey_closed() == Some(true),
    }
}

fn sort_items(items: &mut [&MergedItem], order: SortOrder) {
    match order {
        SortOrder::VehicleAsc => {
            items.sort_by(|a, b| collate(a.vehicle_number(), b.vehicle_number()));
        }
        SortOrder::VehicleDesc => {
            items.sort_by(|a, b| collate(b.vehicle_number(), a.vehicle_number()));
        }
        // Missing timestamps (pending items) sort as earliest
        SortOrder::DateAsc => {
            items.sort_by(|a, b| a.created_at().cmp(&b.created_at()));
        }
        SortOrder::DateDesc => {
            items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        }
    }
}

/// Case-insensitive string ordering with a raw tiebreak; stands in for the
/// original locale collation, which the fleet's digit/letter numbers never
/// exercised beyond case folding.
fn collate(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    match folded {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fleet::WorkItem;
    use crate::models::records::{ChannelReading, DoneRecord, TurnstileRecord};
    use chrono::{TimeZone, Utc};

    fn pending(number: &str, plate: &str, company: &str) -> MergedItem {
        MergedItem::Pending(WorkItem {
            vehicle_id: format!("v-{number}"),
            vehicle_number: number.to_string(),
            vehicle_plate: plate.to_string(),
            company_id: "c1".to_string(),
            company_name: company.to_string(),
        })
    }

    fn done(
        number: &str,
        physical: ChannelReading,
        electronic: ChannelReading,
        journey_closed: bool,
        created_hour: u32,
    ) -> MergedItem {
        MergedItem::Done(DoneRecord {
            record: TurnstileRecord {
                id: format!("r-{number}"),
                vehicle_id: format!("v-{number}"),
                vehicle_number: number.to_string(),
                physical,
                electronic,
                observation: String::new(),
                journey_closed,
                operator_id: "op1".to_string(),
                operator_name: "Marina Souza".to_string(),
                created_at: Utc
                    .with_ymd_and_hms(2024, 3, 5, created_hour, 0, 0)
                    .single(),
                operation_date: Utc.with_ymd_and_hms(2024, 3, 5, 3, 0, 0).single(),
            },
            vehicle_plate: format!("PLT-{number}"),
            company_name: "Viação Azul".to_string(),
        })
    }

    fn all_state() -> ListState {
        let mut state = ListState::new(100);
        state.filters.status = StatusFilter::All;
        state
    }

    #[test]
    fn test_default_filters_show_pending_by_vehicle() {
        let filters = FilterState::default();
        assert_eq!(filters.status, StatusFilter::Pending);
        assert_eq!(filters.sort, SortOrder::VehicleAsc);
        assert_eq!(filters.discrepancy, DiscrepancyFilter::All);
        assert_eq!(filters.journey, JourneyFilter::All);
        assert!(filters.search.is_empty());
    }

    #[test]
    fn test_search_covers_all_display_fields() {
        let items = vec![
            pending("1023", "ABC1D23", "Viação Norte"),
            done(
                "0451",
                ChannelReading::Counted(10),
                ChannelReading::Counted(10),
                false,
                9,
            ),
        ];
        let mut state = all_state();

        for needle in ["abc1d23", "1023", "viação norte"] {
            state.filters.search = needle.to_string();
            let page = apply(&items, &state);
            assert_eq!(page.total, 1, "needle {needle}");
            assert_eq!(page.items[0].vehicle_number(), "1023");
        }

        // Operator name only exists on done items
        state.filters.search = "marina".to_string();
        let page = apply(&items, &state);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].vehicle_number(), "0451");

        state.filters.search = "nowhere".to_string();
        assert_eq!(apply(&items, &state).total, 0);
    }

    #[test]
    fn test_status_filter_partitions() {
        let items = vec![
            pending("1", "P1", "C"),
            done(
                "2",
                ChannelReading::Counted(5),
                ChannelReading::Counted(5),
                false,
                8,
            ),
        ];
        let mut state = all_state();

        state.filters.status = StatusFilter::Pending;
        assert_eq!(apply(&items, &state).items[0].vehicle_number(), "1");

        state.filters.status = StatusFilter::Done;
        assert_eq!(apply(&items, &state).items[0].vehicle_number(), "2");

        state.filters.status = StatusFilter::All;
        assert_eq!(apply(&items, &state).total, 2);
    }

    #[test]
    fn test_discrepancy_filter_excludes_defective_channels() {
        let items = vec![
            done(
                "1",
                ChannelReading::Counted(120),
                ChannelReading::Counted(118),
                false,
                8,
            ),
            done(
                "2",
                ChannelReading::Counted(50),
                ChannelReading::Counted(50),
                false,
                9,
            ),
            done(
                "3",
                ChannelReading::Defective,
                ChannelReading::Counted(70),
                false,
                10,
            ),
            pending("4", "P4", "C"),
        ];
        let mut state = all_state();

        state.filters.discrepancy = DiscrepancyFilter::Yes;
        let page = apply(&items, &state);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].vehicle_number(), "1");

        state.filters.discrepancy = DiscrepancyFilter::No;
        let page = apply(&items, &state);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].vehicle_number(), "2");
    }

    #[test]
    fn test_journey_filter_only_matches_done() {
        let items = vec![
            done(
                "1",
                ChannelReading::Counted(1),
                ChannelReading::Counted(1),
                true,
                8,
            ),
            done(
                "2",
                ChannelReading::Counted(2),
                ChannelReading::Counted(2),
                false,
                9,
            ),
            pending("3", "P3", "C"),
        ];
        let mut state = all_state();

        state.filters.journey = JourneyFilter::Closed;
        let page = apply(&items, &state);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].vehicle_number(), "1");

        state.filters.journey = JourneyFilter::Open;
        let page = apply(&items, &state);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].vehicle_number(), "2");
    }

    #[test]
    fn test_vehicle_sort_is_case_insensitive() {
        let items = vec![
            pending("b20", "P1", "C"),
            pending("A10", "P2", "C"),
            pending("a05", "P3", "C"),
        ];
        let mut state = all_state();

        let page = apply(&items, &state);
        let numbers: Vec<_> = page.items.iter().map(|i| i.vehicle_number()).collect();
        assert_eq!(numbers, vec!["a05", "A10", "b20"]);

        state.filters.sort = SortOrder::VehicleDesc;
        let page = apply(&items, &state);
        let numbers: Vec<_> = page.items.iter().map(|i| i.vehicle_number()).collect();
        assert_eq!(numbers, vec!["b20", "A10", "a05"]);
    }

    #[test]
    fn test_date_sort_places_pending_earliest() {
        let items = vec![
            done(
                "1",
                ChannelReading::Counted(1),
                ChannelReading::Counted(1),
                false,
                14,
            ),
            pending("2", "P2", "C"),
            done(
                "3",
                ChannelReading::Counted(3),
                ChannelReading::Counted(3),
                false,
                8,
            ),
        ];
        let mut state = all_state();

        state.filters.sort = SortOrder::DateAsc;
        let page = apply(&items, &state);
        let numbers: Vec<_> = page.items.iter().map(|i| i.vehicle_number()).collect();
        assert_eq!(numbers, vec!["2", "3", "1"]);

        state.filters.sort = SortOrder::DateDesc;
        let page = apply(&items, &state);
        let numbers: Vec<_> = page.items.iter().map(|i| i.vehicle_number()).collect();
        assert_eq!(numbers, vec!["1", "3", "2"]);
    }

    #[test]
    fn test_pagination_window_and_no_auto_clamp() {
        let items: Vec<_> = (0..25)
            .map(|i| pending(&format!("{i:03}"), "P", "C"))
            .collect();
        let mut state = ListState::new(10);
        state.filters.status = StatusFilter::All;

        let page1 = apply(&items, &state);
        assert_eq!(page1.total, 25);
        assert_eq!(page1.items.len(), 10);
        assert_eq!(page1.items[0].vehicle_number(), "000");

        state.page = 3;
        let page3 = apply(&items, &state);
        assert_eq!(page3.items.len(), 5);
        assert_eq!(page3.items[0].vehicle_number(), "020");

        // Past the end: empty page, total intact, no clamping
        state.page = 9;
        let beyond = apply(&items, &state);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 25);

        assert_eq!(total_pages(25, 10), 3);
        assert!(has_next_page(1, 25, 10));
        assert!(!has_next_page(3, 25, 10));
        assert_eq!(total_pages(0, 10), 1);
    }

    #[test]
    fn test_pagination_covers_every_item_exactly_once() {
        let items: Vec<_> = (0..23)
            .map(|i| pending(&format!("{i:03}"), "P", "C"))
            .collect();
        let mut state = ListState::new(10);
        state.filters.status = StatusFilter::All;

        let mut seen = Vec::new();
        for page_no in 1..=total_pages(23, 10) {
            state.page = page_no;
            let page = apply(&items, &state);
            seen.extend(
                page.items
                    .iter()
                    .map(|i| i.vehicle_number().to_string()),
            );
        }
        let expected: Vec<_> = (0..23).map(|i| format!("{i:03}")).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let items = vec![
            pending("10", "P1", "Companhia"),
            done(
                "20",
                ChannelReading::Counted(9),
                ChannelReading::Counted(7),
                true,
                11,
            ),
        ];
        let mut state = all_state();
        state.filters.search = "1".to_string();
        let first = apply(&items, &state);
        let second = apply(&items, &state);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reducer_resets_page_on_filter_changes() {
        let mut state = ListState::default();
        state.page = 4;

        let next = reduce(&state, ListAction::SetSearch("1023".into()));
        assert_eq!(next.page, 1);
        assert_eq!(next.filters.search, "1023");

        state.page = 4;
        let next = reduce(&state, ListAction::SetStatus(StatusFilter::Done));
        assert_eq!(next.page, 1);

        state.page = 4;
        let next = reduce(&state, ListAction::SetSort(SortOrder::DateDesc));
        assert_eq!(next.page, 1);

        let next = reduce(&state, ListAction::SetPage(7));
        assert_eq!(next.page, 7);
        assert_eq!(next.filters, state.filters);

        let next = reduce(&state, ListAction::SetPage(0));
        assert_eq!(next.page, 1);
    }

    #[test]
    fn test_reducer_page_size_rules() {
        let state = ListState::default();
        let next = reduce(&state, ListAction::SetPageSize(50));
        assert_eq!(next.page_size, 50);
        assert_eq!(next.page, 1);

        // Unsupported size leaves the state untouched
        let next = reduce(&next, ListAction::SetPageSize(37));
        assert_eq!(next.page_size, 50);
    }

    #[test]
    fn test_reducer_clear_restores_defaults_keeping_page_size() {
        let mut state = ListState::new(50);
        state.filters.search = "abc".into();
        state.filters.status = StatusFilter::Done;
        state.page = 3;

        let next = reduce(&state, ListAction::ClearFilters);
        assert_eq!(next.filters, FilterState::default());
        assert_eq!(next.page, 1);
        assert_eq!(next.page_size, 50);
    }
}
