//! Aggregated snapshot state and its reducers

use debugbar_proto::{ErrorInfo, Event, QueryInfo, RequestInfo};
use debugbar_transport::ConnectionStatus;
use tracing::trace;

/// Detail tab shown in the bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Requests,
    Queries,
    Errors,
    Timeline,
}

/// One immutable version of the aggregated client state
///
/// The store never mutates a published snapshot: every change clones the
/// current version, applies one transition, and republishes. Consumers
/// holding an older `Arc` keep a stable view.
///
/// Selection is held by id and projected through
/// [`DebugBarState::selected_request`], so the selected entry can never
/// drift from the one in `requests`.
#[derive(Debug, Clone)]
pub struct DebugBarState {
    pub status: ConnectionStatus,
    pub error_message: Option<String>,
    /// Arrival order, bounded by the configured maximum
    pub requests: Vec<RequestInfo>,
    pub selected_id: Option<String>,
    pub active_tab: Tab,
    pub minimized: bool,
}

impl DebugBarState {
    pub fn new(minimized: bool) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            error_message: None,
            requests: Vec::new(),
            selected_id: None,
            active_tab: Tab::default(),
            minimized,
        }
    }

    /// Fold one decoded event into the state
    pub fn apply_event(&mut self, event: Event, max_requests: usize) {
        match event {
            Event::History(requests) => {
                let skip = requests.len().saturating_sub(max_requests);
                self.requests = requests.into_iter().skip(skip).collect();
            }
            Event::Request(request) => {
                // A duplicate id is a no-op regardless of completion state.
                if self.find(&request.id).is_none() {
                    self.requests.push(request);
                    self.evict(max_requests);
                }
            }
            Event::RequestEnd(request) => {
                match self.requests.iter_mut().find(|r| r.id == request.id) {
                    Some(existing) => *existing = request,
                    None => trace!(id = %request.id, "request_end for unknown request"),
                }
            }
            Event::Query(query) => {
                match self.requests.iter_mut().find(|r| r.id == query.request_id) {
                    Some(request) => request.queries.push(query),
                    None => trace!(request_id = %query.request_id, "query for unknown request"),
                }
            }
            Event::Error(error) => {
                match self.requests.iter_mut().find(|r| r.id == error.request_id) {
                    Some(request) => request.errors.push(error),
                    None => trace!(request_id = %error.request_id, "error for unknown request"),
                }
            }
            Event::Ping | Event::Pong => {}
        }
    }

    // User-action reducers

    pub fn select_request(&mut self, id: Option<&str>) {
        self.selected_id = id.map(str::to_owned);
    }

    pub fn set_active_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    pub fn toggle_minimized(&mut self) {
        self.minimized = !self.minimized;
    }

    pub fn set_minimized(&mut self, minimized: bool) {
        self.minimized = minimized;
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
        self.selected_id = None;
    }

    // Derived projections, recomputed from the snapshot on every read

    pub fn selected_request(&self) -> Option<&RequestInfo> {
        self.find(self.selected_id.as_deref()?)
    }

    pub fn total_queries(&self) -> usize {
        self.requests.iter().map(|r| r.queries.len()).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.requests.iter().map(|r| r.errors.len()).sum()
    }

    pub fn selected_queries(&self) -> &[QueryInfo] {
        self.selected_request()
            .map(|r| r.queries.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_errors(&self) -> &[ErrorInfo] {
        self.selected_request()
            .map(|r| r.errors.as_slice())
            .unwrap_or(&[])
    }

    fn find(&self, id: &str) -> Option<&RequestInfo> {
        self.requests.iter().find(|r| r.id == id)
    }

    fn evict(&mut self, max_requests: usize) {
        while self.requests.len() > max_requests {
            self.requests.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use debugbar_proto::ErrorKind;
    use std::collections::HashMap;

    const MAX: usize = 100;

    fn request(id: &str) -> RequestInfo {
        RequestInfo {
            id: id.to_string(),
            method: "GET".to_string(),
            path: format!("/{id}"),
            status_code: None,
            duration: 0,
            duration_ms: 0.0,
            start_time: Utc::now(),
            end_time: None,
            headers: HashMap::new(),
            query_params: HashMap::new(),
            request_body: None,
            response_size: 0,
            client_ip: "127.0.0.1".to_string(),
            queries: Vec::new(),
            errors: Vec::new(),
            memory_usage: 0,
            custom_data: None,
        }
    }

    fn completed(id: &str) -> RequestInfo {
        let mut request = request(id);
        request.status_code = Some(200);
        request.end_time = Some(Utc::now());
        request.duration_ms = 12.5;
        request
    }

    fn query(id: &str, request_id: &str) -> QueryInfo {
        QueryInfo {
            id: id.to_string(),
            request_id: request_id.to_string(),
            query: "SELECT 1".to_string(),
            args: None,
            duration: 0,
            duration_ms: 0.1,
            rows_affected: 1,
            error: None,
            start_time: Utc::now(),
            source: None,
        }
    }

    fn error(id: &str, request_id: &str) -> ErrorInfo {
        ErrorInfo {
            id: id.to_string(),
            request_id: request_id.to_string(),
            message: "boom".to_string(),
            stack: None,
            kind: ErrorKind::Exception,
            timestamp: Utc::now(),
            context: None,
        }
    }

    #[test]
    fn duplicate_request_events_are_idempotent() {
        let mut state = DebugBarState::new(false);

        state.apply_event(Event::Request(request("a")), MAX);
        state.apply_event(Event::Request(request("a")), MAX);
        assert_eq!(state.requests.len(), 1);

        // Still a no-op once the request has completed.
        state.apply_event(Event::RequestEnd(completed("a")), MAX);
        state.apply_event(Event::Request(request("a")), MAX);
        assert_eq!(state.requests.len(), 1);
        assert!(state.requests[0].is_complete());
    }

    #[test]
    fn appends_preserve_order_and_prior_entries() {
        let mut state = DebugBarState::new(false);
        state.apply_event(Event::Request(request("a")), MAX);

        state.apply_event(Event::Query(query("q1", "a")), MAX);
        state.apply_event(Event::Query(query("q2", "a")), MAX);
        state.apply_event(Event::Error(error("e1", "a")), MAX);

        let tracked = &state.requests[0];
        assert_eq!(
            tracked.queries.iter().map(|q| q.id.as_str()).collect::<Vec<_>>(),
            &["q1", "q2"]
        );
        assert_eq!(tracked.errors.len(), 1);
        assert_eq!(tracked.errors[0].id, "e1");
    }

    #[test]
    fn events_for_unknown_requests_create_no_orphans() {
        let mut state = DebugBarState::new(false);
        state.apply_event(Event::Request(request("a")), MAX);

        state.apply_event(Event::Query(query("q1", "ghost")), MAX);
        state.apply_event(Event::Error(error("e1", "ghost")), MAX);
        state.apply_event(Event::RequestEnd(completed("ghost")), MAX);

        assert_eq!(state.requests.len(), 1);
        assert_eq!(state.total_queries(), 0);
        assert_eq!(state.total_errors(), 0);
    }

    #[test]
    fn retention_evicts_oldest_first() {
        let mut state = DebugBarState::new(false);
        for id in ["a", "b", "c", "d", "e"] {
            state.apply_event(Event::Request(request(id)), 3);
        }

        assert_eq!(
            state.requests.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            &["c", "d", "e"]
        );
    }

    #[test]
    fn history_replaces_wholesale_truncated_to_most_recent() {
        let mut state = DebugBarState::new(false);
        state.apply_event(Event::Request(request("old")), MAX);

        let history = vec![request("a"), request("b"), request("c"), request("d")];
        state.apply_event(Event::History(history), 2);

        assert_eq!(
            state.requests.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            &["c", "d"]
        );
    }

    #[test]
    fn request_end_replaces_in_place() {
        let mut state = DebugBarState::new(false);
        state.apply_event(Event::Request(request("a")), MAX);
        state.apply_event(Event::Request(request("b")), MAX);

        state.apply_event(Event::RequestEnd(completed("a")), MAX);

        assert_eq!(state.requests[0].id, "a");
        assert_eq!(state.requests[0].status_code, Some(200));
        assert!(!state.requests[1].is_complete());
    }

    #[test]
    fn selection_tracks_updates_never_a_stale_copy() {
        let mut state = DebugBarState::new(false);
        state.apply_event(Event::Request(request("a")), MAX);
        state.select_request(Some("a"));

        state.apply_event(Event::RequestEnd(completed("a")), MAX);
        let selected = state.selected_request().expect("selection lost");
        assert_eq!(selected.status_code, Some(200));

        state.apply_event(Event::Query(query("q1", "a")), MAX);
        assert_eq!(state.selected_queries().len(), 1);
        assert_eq!(state.selected_queries()[0].id, "q1");

        state.apply_event(Event::Error(error("e1", "a")), MAX);
        assert_eq!(state.selected_errors().len(), 1);
    }

    #[test]
    fn evicting_the_selected_request_clears_the_projection() {
        let mut state = DebugBarState::new(false);
        state.apply_event(Event::Request(request("a")), 2);
        state.select_request(Some("a"));

        state.apply_event(Event::Request(request("b")), 2);
        state.apply_event(Event::Request(request("c")), 2);

        assert!(state.selected_request().is_none());
        assert!(state.selected_queries().is_empty());
    }

    #[test]
    fn clear_drops_requests_and_selection() {
        let mut state = DebugBarState::new(false);
        state.apply_event(Event::Request(request("a")), MAX);
        state.select_request(Some("a"));

        state.clear_requests();

        assert!(state.requests.is_empty());
        assert!(state.selected_id.is_none());
        assert!(state.selected_request().is_none());
    }

    #[test]
    fn totals_sum_across_all_requests() {
        let mut state = DebugBarState::new(false);
        state.apply_event(Event::Request(request("a")), MAX);
        state.apply_event(Event::Request(request("b")), MAX);
        state.apply_event(Event::Query(query("q1", "a")), MAX);
        state.apply_event(Event::Query(query("q2", "b")), MAX);
        state.apply_event(Event::Query(query("q3", "b")), MAX);
        state.apply_event(Event::Error(error("e1", "a")), MAX);

        assert_eq!(state.total_queries(), 3);
        assert_eq!(state.total_errors(), 1);
    }

    #[test]
    fn ui_reducers() {
        let mut state = DebugBarState::new(true);
        assert!(state.minimized);

        state.toggle_minimized();
        assert!(!state.minimized);
        state.set_minimized(true);
        assert!(state.minimized);

        state.set_active_tab(Tab::Queries);
        assert_eq!(state.active_tab, Tab::Queries);

        state.select_request(Some("x"));
        assert_eq!(state.selected_id.as_deref(), Some("x"));
        state.select_request(None);
        assert!(state.selected_id.is_none());
    }

    #[test]
    fn ping_pong_leave_state_untouched() {
        let mut state = DebugBarState::new(false);
        state.apply_event(Event::Request(request("a")), MAX);

        state.apply_event(Event::Ping, MAX);
        state.apply_event(Event::Pong, MAX);

        assert_eq!(state.requests.len(), 1);
    }
}
