//! `Accept` header parsing and quality lookup.

/// HTTP q-value stored as integer thousandths, `0..=1000`.
///
/// Q-values carry at most three decimal places, so thousandths are exact
/// and keep the ordering total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u16);

impl Quality {
    pub const ZERO: Self = Quality(0);
    pub const MAX: Self = Quality(1000);

    pub fn from_millis(millis: u16) -> Self {
        Quality(millis.min(1000))
    }

    pub fn millis(self) -> u16 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parses a q-value like `0.9`. Values are clamped to `[0, 1]`.
    pub fn parse(s: &str) -> Option<Self> {
        let q: f32 = s.trim().parse().ok()?;
        if !q.is_finite() {
            return None;
        }
        let millis = (q.max(0.0).min(1.0) * 1000.0).round() as u16;
        Some(Quality(millis))
    }
}

/// Quality mapping parsed from an `Accept` header.
///
/// An empty map means the client did not negotiate at all; every lookup
/// then yields [`Quality::MAX`].
#[derive(Debug, Clone, Default)]
pub struct AcceptMap {
    items: Vec<(Box<str>, Quality)>,
}

impl AcceptMap {
    /// Parses a comma-separated `type/subtype[;q=value]` list.
    ///
    /// Malformed tokens are skipped instead of failing the whole header;
    /// an unparsable `q` parameter falls back to 1.
    pub fn parse(header: &str) -> Self {
        let mut items = Vec::new();
        for token in header.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let mut params = token.split(';');
            let mime = params.next().unwrap_or("").trim();
            if !is_mimetype(mime) {
                continue;
            }
            let mut quality = Quality::MAX;
            for param in params {
                if let Some((name, value)) = param.split_once('=') {
                    if name.trim().eq_ignore_ascii_case("q") {
                        quality = Quality::parse(value).unwrap_or(Quality::MAX);
                    }
                }
            }
            items.push((mime.to_ascii_lowercase().into_boxed_str(), quality));
        }
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Looks up the quality for `mimetype`: exact entry first, then
    /// `type/*`, then `*/*`. Unlisted types get 0.
    pub fn quality(&self, mimetype: &str) -> Quality {
        if self.items.is_empty() {
            return Quality::MAX;
        }
        if let Some(q) = self.find(mimetype) {
            return q;
        }
        if let Some(slash) = mimetype.find('/') {
            let range = format!("{}/*", &mimetype[..slash]);
            if let Some(q) = self.find(&range) {
                return q;
            }
        }
        self.find("*/*").unwrap_or(Quality::ZERO)
    }

    fn find(&self, key: &str) -> Option<Quality> {
        self.items
            .iter()
            .find(|(mime, _)| mime.as_ref().eq_ignore_ascii_case(key))
            .map(|&(_, q)| q)
    }
}

fn is_mimetype(token: &str) -> bool {
    let mut halves = token.splitn(2, '/');
    match (halves.next(), halves.next()) {
        (Some(t), Some(s)) => !t.is_empty() && !s.is_empty(),
        _ => false,
    }
}
