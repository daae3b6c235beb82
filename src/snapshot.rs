//! Loads the lead snapshot that every page renders from.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::{Date, UtcOffset};

use crate::{
    Error,
    filters::{FILTER_FIELDS, FilterOptions, FilterQuery},
    analytics::{distinct_values, filter_leads},
    lead::{Lead, get_all_leads},
    timezone::{local_offset_or_error, local_today},
};

/// Every stored lead, plus the local date context used to interpret filters.
#[derive(Debug)]
pub struct Snapshot {
    pub leads: Vec<Lead>,
    pub local_offset: UtcOffset,
    pub today: Date,
}

impl Snapshot {
    /// Load every lead. The database lock is released before returning.
    ///
    /// # Errors
    /// Returns an error if the timezone is invalid, the lock is poisoned or
    /// the leads cannot be read.
    pub fn load(db_connection: &Arc<Mutex<Connection>>, local_timezone: &str) -> Result<Self, Error> {
        let local_offset = local_offset_or_error(local_timezone)?;

        let leads = {
            let connection = db_connection
                .lock()
                .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
                .map_err(|_| Error::DatabaseLockError)?;

            get_all_leads(&connection)
                .inspect_err(|error| tracing::error!("could not load leads: {error}"))?
        };

        Ok(Self {
            leads,
            local_offset,
            today: local_today(local_offset),
        })
    }

    pub fn all(&self) -> Vec<&Lead> {
        self.leads.iter().collect()
    }

    /// The leads selected by `query`, in stored order.
    pub fn filtered(&self, query: &FilterQuery) -> Vec<&Lead> {
        let spec = query.to_filter_spec(self.local_offset, self.today);

        filter_leads(&self.leads, &spec)
    }

    /// The checkbox options for every filter field, from the unfiltered leads.
    pub fn filter_options(&self) -> FilterOptions {
        let all = self.all();

        FILTER_FIELDS
            .into_iter()
            .map(|field| (field, distinct_values(&all, field)))
            .collect()
    }
}
