use crate::error::ServeError;

pub const BROTLI_ENCODING: &str = "br";
pub const BROTLI_EXTENSION: &str = ".br";
pub const GZIP_ENCODING: &str = "gzip";
pub const GZIP_EXTENSION: &str = ".gz";

/// One precompressed flavour: the `Content-Encoding` token and the suffix of
/// the file holding it on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub token: String,
    pub extension: String,
}

/// Ordered encodings; earlier entries win when the client accepts several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingTable {
    entries: Vec<Encoding>,
}

impl Default for EncodingTable {
    fn default() -> Self {
        Self {
            entries: vec![
                Encoding {
                    token: BROTLI_ENCODING.to_string(),
                    extension: BROTLI_EXTENSION.to_string(),
                },
                Encoding {
                    token: GZIP_ENCODING.to_string(),
                    extension: GZIP_EXTENSION.to_string(),
                },
            ],
        }
    }
}

impl EncodingTable {
    /// Builds the table from parallel token and extension lists.
    pub fn new<T, E>(tokens: &[T], extensions: &[E]) -> Result<Self, ServeError>
    where
        T: AsRef<str>,
        E: AsRef<str>,
    {
        if tokens.len() != extensions.len() {
            return Err(ServeError::ConfigInvalid(format!(
                "{} encodings but {} extensions",
                tokens.len(),
                extensions.len()
            )));
        }

        let mut entries = Vec::with_capacity(tokens.len());
        for (token, extension) in tokens.iter().zip(extensions) {
            let token = token.as_ref().trim();
            let extension = extension.as_ref().trim();
            if token.is_empty() || extension.is_empty() {
                return Err(ServeError::ConfigInvalid(format!(
                    "empty encoding entry ({:?}, {:?})",
                    token, extension
                )));
            }
            entries.push(Encoding {
                token: token.to_string(),
                extension: extension.to_string(),
            });
        }

        Ok(Self { entries })
    }

    /// A table that never serves precompressed variants.
    pub fn none() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Encoding> {
        self.entries.iter()
    }

    /// Entries the client advertises, in table order.
    pub fn accepted_by(&self, accept_encoding: Option<&str>) -> Vec<&Encoding> {
        let Some(header) = accept_encoding.map(str::trim).filter(|h| !h.is_empty()) else {
            return Vec::new();
        };
        self.entries
            .iter()
            .filter(|encoding| accepts(header, &encoding.token))
            .collect()
    }
}

/// Plain containment test; `q=` weights are not interpreted.
pub fn accepts(accept_encoding: &str, token: &str) -> bool {
    accept_encoding
        .to_lowercase()
        .contains(&token.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(table: &EncodingTable, header: Option<&str>) -> Vec<String> {
        table
            .accepted_by(header)
            .into_iter()
            .map(|e| e.token.clone())
            .collect()
    }

    #[test]
    fn default_prefers_brotli_then_gzip() {
        let table = EncodingTable::default();
        assert_eq!(tokens(&table, Some("gzip, deflate, br")), ["br", "gzip"]);
        assert_eq!(tokens(&table, Some("gzip")), ["gzip"]);
        assert_eq!(tokens(&table, Some("BR")), ["br"]);
    }

    #[test]
    fn absent_or_empty_header_accepts_nothing() {
        let table = EncodingTable::default();
        assert!(tokens(&table, None).is_empty());
        assert!(tokens(&table, Some("   ")).is_empty());
        assert!(tokens(&table, Some("identity")).is_empty());
    }

    #[test]
    fn mismatched_lists_are_rejected() {
        let err = EncodingTable::new(&["br", "gzip"], &[".br"]).unwrap_err();
        assert!(matches!(err, ServeError::ConfigInvalid(_)));

        let err = EncodingTable::new(&["br"], &[""]).unwrap_err();
        assert!(matches!(err, ServeError::ConfigInvalid(_)));
    }

    #[test]
    fn custom_order_is_kept() {
        let table = EncodingTable::new(&["zstd", "gzip"], &[".zst", ".gz"]).unwrap();
        assert_eq!(tokens(&table, Some("gzip, zstd")), ["zstd", "gzip"]);
        assert!(tokens(&EncodingTable::none(), Some("gzip")).is_empty());
    }
}
