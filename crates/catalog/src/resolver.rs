//! Resolves descriptive text for a selected region.
//!
//! Summary priority is the bundled static table, then the local store, then
//! the encyclopedia. The other fields prefer the local store over the static
//! table and fall back to placeholders. Resolution never fails: every source
//! problem degrades to the next source or a placeholder.

use std::cell::RefCell;

use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::InfoCache;
use crate::encyclopedia::SummaryError;
use crate::info::{MISSING_DETAIL, MISSING_FACT, MISSING_SUMMARY, RegionInfo, first_text};
use crate::static_table::StaticTable;
use crate::store::{StoreError, StoreRecord, find_record};

/// I/O the resolver depends on. The browser client implements this over
/// `fetch`; tests use in-memory fakes.
pub trait InfoSources {
    /// The whole local store, fetched fresh.
    fn fetch_store(&self) -> LocalBoxFuture<'_, Result<Vec<StoreRecord>, StoreError>>;

    /// Encyclopedia intro extract for `title`.
    fn fetch_summary<'a>(&'a self, title: &'a str) -> LocalBoxFuture<'a, Result<String, SummaryError>>;

    /// Persists a newly fetched summary to the local store.
    fn persist_summary<'a>(&'a self, write: &'a SummaryWrite) -> LocalBoxFuture<'a, Result<(), StoreError>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    Static,
    Store,
    Encyclopedia,
    Placeholder,
}

/// Body of the best-effort store write-back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryWrite {
    pub name: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub info: RegionInfo,
    pub summary_source: SummarySource,
    /// Present when the summary came from the encyclopedia and the store had
    /// no entry for the region.
    pub write_back: Option<SummaryWrite>,
}

pub struct InfoResolver<S> {
    sources: S,
    table: StaticTable,
}

impl<S: InfoSources> InfoResolver<S> {
    pub fn new(sources: S, table: StaticTable) -> Self {
        Self { sources, table }
    }

    pub fn sources(&self) -> &S {
        &self.sources
    }

    pub async fn resolve(&self, name: &str) -> Resolution {
        let fixed = self.table.get(name);
        let local = match self.sources.fetch_store().await {
            Ok(records) => find_record(&records, name).cloned(),
            Err(e) => {
                warn!(region = name, "local store unavailable: {e}");
                None
            }
        };

        let (short, summary_source) = if let Some(text) =
            first_text([fixed.and_then(|e| e.summary.as_deref())])
        {
            (text, SummarySource::Static)
        } else if let Some(text) = first_text([local.as_ref().and_then(|r| r.summary.as_deref())]) {
            (text, SummarySource::Store)
        } else {
            match self.sources.fetch_summary(name).await {
                Ok(text) => (text, SummarySource::Encyclopedia),
                Err(e) => {
                    warn!(region = name, "summary unavailable: {e}");
                    (MISSING_SUMMARY.to_string(), SummarySource::Placeholder)
                }
            }
        };

        let local_ref = local.as_ref();
        let info = RegionInfo {
            capital: pick(
                local_ref.and_then(|r| r.capital.as_deref()),
                fixed.and_then(|e| e.capital.as_deref()),
                MISSING_FACT,
            ),
            population: pick(
                local_ref.and_then(|r| r.population.as_deref()),
                fixed.and_then(|e| e.population.as_deref()),
                MISSING_FACT,
            ),
            short: short.clone(),
            politics: pick(
                local_ref.and_then(|r| r.politics.as_deref()),
                fixed.and_then(|e| e.politics.as_deref()),
                MISSING_DETAIL,
            ),
            economics: pick(
                local_ref.and_then(|r| r.economics.as_deref()),
                fixed.and_then(|e| e.economics.as_deref()),
                MISSING_DETAIL,
            ),
        };

        let write_back = (summary_source == SummarySource::Encyclopedia && local.is_none()).then(|| {
            SummaryWrite {
                name: name.to_string(),
                summary: short,
            }
        });
        debug!(region = name, source = ?summary_source, "resolved region info");
        Resolution {
            info,
            summary_source,
            write_back,
        }
    }

    /// Performs a write-back once. Failures are logged and dropped.
    pub async fn write_back(&self, write: &SummaryWrite) {
        if let Err(e) = self.sources.persist_summary(write).await {
            warn!(region = %write.name, "summary write-back failed: {e}");
        }
    }
}

fn pick(local: Option<&str>, fixed: Option<&str>, placeholder: &str) -> String {
    first_text([local, fixed]).unwrap_or_else(|| placeholder.to_string())
}

/// Runs a resolution for `name` unless one is already loading or done.
///
/// Returns `None` when nothing was started. The cache is never borrowed
/// across an await point.
pub async fn request_info<S: InfoSources>(
    resolver: &InfoResolver<S>,
    cache: &RefCell<InfoCache>,
    name: &str,
) -> Option<Resolution> {
    if name.trim().is_empty() {
        cache.borrow_mut().fail(name, "empty region name");
        return None;
    }
    if !cache.borrow_mut().begin(name) {
        return None;
    }
    let resolution = resolver.resolve(name).await;
    cache.borrow_mut().complete(name, resolution.info.clone());
    Some(resolution)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::task::Poll;

    use futures_util::FutureExt as _;
    use futures_util::future::{LocalBoxFuture, join, poll_fn};
    use pretty_assertions::assert_eq;

    use super::{InfoResolver, InfoSources, Resolution, SummarySource, SummaryWrite, request_info};
    use crate::cache::{InfoCache, InfoState};
    use crate::encyclopedia::SummaryError;
    use crate::info::RegionInfo;
    use crate::static_table::{StaticEntry, StaticTable};
    use crate::store::{StoreError, StoreRecord};

    struct Fake {
        store: Result<Vec<StoreRecord>, StoreError>,
        summary: Result<String, SummaryError>,
        persist: Result<(), StoreError>,
        titles: RefCell<Vec<String>>,
        store_calls: Cell<usize>,
        writes: RefCell<Vec<SummaryWrite>>,
    }

    impl Fake {
        fn new(store: Vec<StoreRecord>, summary: Result<String, SummaryError>) -> Self {
            Self {
                store: Ok(store),
                summary,
                persist: Ok(()),
                titles: RefCell::new(Vec::new()),
                store_calls: Cell::new(0),
                writes: RefCell::new(Vec::new()),
            }
        }
    }

    async fn yield_once() {
        let mut yielded = false;
        poll_fn(|cx| {
            if yielded {
                Poll::Ready(())
            } else {
                yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        })
        .await
    }

    impl InfoSources for Fake {
        fn fetch_store(&self) -> LocalBoxFuture<'_, Result<Vec<StoreRecord>, StoreError>> {
            self.store_calls.set(self.store_calls.get() + 1);
            async move {
                yield_once().await;
                self.store.clone()
            }
            .boxed_local()
        }

        fn fetch_summary<'a>(&'a self, title: &'a str) -> LocalBoxFuture<'a, Result<String, SummaryError>> {
            self.titles.borrow_mut().push(title.to_string());
            let out = self.summary.clone();
            async move { out }.boxed_local()
        }

        fn persist_summary<'a>(&'a self, write: &'a SummaryWrite) -> LocalBoxFuture<'a, Result<(), StoreError>> {
            self.writes.borrow_mut().push(write.clone());
            let out = self.persist.clone();
            async move { out }.boxed_local()
        }
    }

    fn table() -> StaticTable {
        let mut entries = BTreeMap::new();
        entries.insert(
            "France".to_string(),
            StaticEntry {
                capital: Some("Paris".into()),
                population: Some("68 million".into()),
                summary: Some("Static France.".into()),
                politics: None,
                economics: Some("Static economy.".into()),
            },
        );
        StaticTable::new(entries)
    }

    fn record(name: &str, summary: Option<&str>, capital: Option<&str>) -> StoreRecord {
        let mut r = StoreRecord::new(name);
        r.summary = summary.map(str::to_string);
        r.capital = capital.map(str::to_string);
        r
    }

    #[test]
    fn germany_timeout_resolves_to_placeholders() {
        let resolver = InfoResolver::new(Fake::new(vec![], Err(SummaryError::Timeout)), table());
        let cache = RefCell::new(InfoCache::new());

        let res = pollster::block_on(request_info(&resolver, &cache, "Germany")).unwrap();

        assert_eq!(*resolver.sources().titles.borrow(), vec!["Germany".to_string()]);
        let expected = RegionInfo {
            capital: "—".into(),
            population: "—".into(),
            short: "No summary available.".into(),
            politics: "Data not provided.".into(),
            economics: "Data not provided.".into(),
        };
        assert_eq!(
            res,
            Resolution {
                info: expected.clone(),
                summary_source: SummarySource::Placeholder,
                write_back: None,
            }
        );
        assert_eq!(cache.borrow().get("Germany"), Some(&InfoState::Ready(expected)));
    }

    #[test]
    fn concurrent_requests_resolve_once() {
        let resolver = InfoResolver::new(Fake::new(vec![], Ok("Text.".into())), table());
        let cache = RefCell::new(InfoCache::new());

        let (a, b) = pollster::block_on(join(
            request_info(&resolver, &cache, "Peru"),
            request_info(&resolver, &cache, "Peru"),
        ));

        assert!(a.is_some());
        assert!(b.is_none());
        assert_eq!(resolver.sources().store_calls.get(), 1);
        assert_eq!(resolver.sources().titles.borrow().len(), 1);
        assert!(pollster::block_on(request_info(&resolver, &cache, "Peru")).is_none());
    }

    #[test]
    fn static_summary_wins_but_store_fields_win_over_static() {
        let store = vec![record("France", Some("Stored France."), Some("Paris (store)"))];
        let resolver = InfoResolver::new(Fake::new(store, Ok("Wiki.".into())), table());

        let res = pollster::block_on(resolver.resolve("France"));

        assert_eq!(res.summary_source, SummarySource::Static);
        assert_eq!(res.info.short, "Static France.");
        assert_eq!(res.info.capital, "Paris (store)");
        assert_eq!(res.info.population, "68 million");
        assert_eq!(res.info.politics, "Data not provided.");
        assert_eq!(res.info.economics, "Static economy.");
        assert!(resolver.sources().titles.borrow().is_empty());
        assert_eq!(res.write_back, None);
    }

    #[test]
    fn store_summary_precedes_encyclopedia() {
        let store = vec![record("Chile", Some("Long and thin."), None)];
        let resolver = InfoResolver::new(Fake::new(store, Ok("Wiki.".into())), table());

        let res = pollster::block_on(resolver.resolve("Chile"));

        assert_eq!(res.summary_source, SummarySource::Store);
        assert_eq!(res.info.short, "Long and thin.");
        assert!(resolver.sources().titles.borrow().is_empty());
    }

    #[test]
    fn encyclopedia_summary_is_written_back_only_without_local_entry() {
        let resolver = InfoResolver::new(Fake::new(vec![], Ok("Andean country.".into())), table());
        let res = pollster::block_on(resolver.resolve("Peru"));
        let write = res.write_back.clone().unwrap();
        assert_eq!(
            write,
            SummaryWrite {
                name: "Peru".into(),
                summary: "Andean country.".into(),
            }
        );
        pollster::block_on(resolver.write_back(&write));
        assert_eq!(resolver.sources().writes.borrow().len(), 1);

        let store = vec![record("Peru", None, Some("Lima"))];
        let resolver = InfoResolver::new(Fake::new(store, Ok("Andean country.".into())), table());
        let res = pollster::block_on(resolver.resolve("Peru"));
        assert_eq!(res.summary_source, SummarySource::Encyclopedia);
        assert_eq!(res.info.capital, "Lima");
        assert_eq!(res.write_back, None);
    }

    #[test]
    fn store_and_write_failures_degrade_quietly() {
        let mut fake = Fake::new(vec![], Err(SummaryError::Http(503)));
        fake.store = Err(StoreError::Io("offline".into()));
        fake.persist = Err(StoreError::Io("read-only".into()));
        let resolver = InfoResolver::new(fake, table());

        let res = pollster::block_on(resolver.resolve("France"));
        assert_eq!(res.info.capital, "Paris");
        assert_eq!(res.info.short, "Static France.");

        pollster::block_on(resolver.write_back(&SummaryWrite {
            name: "France".into(),
            summary: "x".into(),
        }));
        assert_eq!(resolver.sources().writes.borrow().len(), 1);
    }

    #[test]
    fn empty_name_is_an_error_state() {
        let resolver = InfoResolver::new(Fake::new(vec![], Ok("x".into())), table());
        let cache = RefCell::new(InfoCache::new());
        assert!(pollster::block_on(request_info(&resolver, &cache, "  ")).is_none());
        assert!(matches!(cache.borrow().get("  "), Some(InfoState::Error(_))));
        assert_eq!(resolver.sources().store_calls.get(), 0);
    }
}
