use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// One blacklist record: a lowercase host suffix and its hit counter.
///
/// `hits` uses relaxed atomics so lookups can count matches while the
/// filter is shared read-only across sessions. The on-disk count is a
/// best-effort snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct DomainEntry {
    pub name: String,
    #[serde(default)]
    pub hits: AtomicU64,
}

impl DomainEntry {
    pub fn new(name: String) -> Self {
        Self {
            name,
            hits: AtomicU64::new(0),
        }
    }

    /// Suffix comparison against an already-lowercased query.
    ///
    /// An entry matches iff the query ends with the entry name
    /// byte-for-byte. There is no dot-boundary check: `badhost.com`
    /// matches both `evil.badhost.com` and `xbadhost.com`. IP literals
    /// get no special treatment.
    pub fn matches(&self, item: &str) -> bool {
        let (qlen, nlen) = (item.len(), self.name.len());
        qlen >= nlen && item.as_bytes()[qlen - nlen..] == *self.name.as_bytes()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

/// Ordered blacklist with first-match-in-order lookup semantics.
#[derive(Debug, Default)]
pub struct DomainFilter {
    domains: Vec<DomainEntry>,
    file_name: Option<PathBuf>,
}

impl DomainFilter {
    /// Check a destination host against the blacklist.
    ///
    /// Scans entries in stored order; the first matching entry gets its
    /// hit counter incremented.
    pub fn matches(&self, item: &str) -> bool {
        let item = item.to_ascii_lowercase();
        for entry in &self.domains {
            if entry.matches(&item) {
                entry.hits.fetch_add(1, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Load a JSON array of `{name, hits}` records.
    ///
    /// Returns false on any I/O or parse failure, leaving the entry list
    /// unchanged. The path is remembered either way so a later `save()`
    /// writes to the requested location even when the initial load found
    /// no file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.file_name = Some(path.to_path_buf());
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(_) => return false,
        };
        let domains: Vec<DomainEntry> = match serde_json::from_slice(&data) {
            Ok(domains) => domains,
            Err(_) => return false,
        };
        self.domains = domains;
        self.deduplicate();
        true
    }

    /// Ingest hosts-file style lines from a local file.
    ///
    /// Returns whether the file was readable and the number of non-empty
    /// lines seen (comments included).
    pub fn load_list_file(&mut self, path: impl AsRef<Path>) -> (bool, usize) {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(_) => return (false, 0),
        };
        let count = self.ingest_lines(&data);
        self.deduplicate();
        (true, count)
    }

    /// Ingest hosts-file style lines fetched from a URL.
    pub async fn load_http(&mut self, url: &str) -> (bool, usize) {
        let response = match reqwest::get(url).await {
            Ok(response) => response,
            Err(_) => return (false, 0),
        };
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(_) => return (false, 0),
        };
        let count = self.ingest_lines(&body);
        self.deduplicate();
        (true, count)
    }

    /// Parse line-oriented blacklist data.
    ///
    /// Lines are split on LF or CR with empty segments discarded. Each
    /// surviving line is lowercased and space-trimmed; `#` comments are
    /// skipped; for multi-field lines ("0.0.0.0 badhost.com") the last
    /// field is the host.
    fn ingest_lines(&mut self, data: &[u8]) -> usize {
        let text = String::from_utf8_lossy(data);
        let mut count = 0;
        for segment in text.split(['\n', '\r']) {
            if segment.is_empty() {
                continue;
            }
            count += 1;
            let line = segment.to_ascii_lowercase();
            let line = line.trim_matches(' ');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let host = line.split(' ').next_back().unwrap_or(line);
            self.domains.push(DomainEntry::new(host.to_string()));
        }
        count
    }

    /// Drop every entry that suffix-matches a later entry's name, keeping
    /// the later duplicate. Stable otherwise.
    fn deduplicate(&mut self) {
        let mut keep = vec![true; self.domains.len()];
        for i in 0..self.domains.len() {
            for j in i + 1..self.domains.len() {
                if self.domains[i].matches(&self.domains[j].name) {
                    keep[i] = false;
                    break;
                }
            }
        }
        let mut flags = keep.into_iter();
        self.domains.retain(|_| flags.next().unwrap_or(true));
    }

    /// Write the current entries as indented JSON.
    ///
    /// Goes through a temporary file and an atomic rename so a crash
    /// mid-write cannot corrupt an existing blacklist.
    pub fn save_file(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let data = match serde_json::to_vec_pretty(&self.domains) {
            Ok(data) => data,
            Err(_) => return false,
        };
        let mut tmp = path.to_path_buf();
        tmp.set_extension("tmp");
        if fs::write(&tmp, &data).is_err() {
            return false;
        }
        fs::rename(&tmp, path).is_ok()
    }

    /// Save to the remembered load path, if any.
    pub fn save(&self) {
        if let Some(path) = self.file_name.clone() {
            self.save_file(path);
        }
    }
}
