use rusqlite::Connection;

use crate::{
    AppState,
    lead::{Lead, insert_lead},
    pagination::PaginationConfig,
};

/// A lead registered at `registered_at` (RFC 3339) with the other fields empty.
pub(crate) fn lead_at(id: &str, registered_at: &str) -> Lead {
    Lead {
        registered_at: Some(registered_at.to_owned()),
        ..Lead::new(id)
    }
}

/// An [AppState] backed by an in-memory database holding `leads`, using UTC
/// as the local timezone and no chat client.
pub(crate) fn state_with_leads(leads: &[Lead]) -> AppState {
    let connection = Connection::open_in_memory().expect("Could not open database in memory");
    let state = AppState::new(connection, "Etc/UTC", PaginationConfig::default(), None)
        .expect("Could not create app state");

    {
        let connection = state.db_connection.lock().unwrap();
        for lead in leads {
            insert_lead(lead, &connection).expect("Could not insert lead");
        }
    }

    state
}
