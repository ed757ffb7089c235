use std::io;

use crate::compression::{Encoding, EncodingTable};
use crate::fs::FileSystem;

/// Opens `name`, preferring a precompressed sibling the client accepts.
///
/// Variants are tried in table order and the first one that opens is final.
/// Failures on variants are only traced; the plain file is the fallback and
/// its error is returned untouched.
pub fn open_encoded<'t, F: FileSystem>(
    fs: &F,
    name: &str,
    accept_encoding: Option<&str>,
    table: &'t EncodingTable,
) -> io::Result<(F::File, Option<&'t Encoding>)> {
    for encoding in table.accepted_by(accept_encoding) {
        let variant = format!("{}{}", name, encoding.extension);
        match fs.open(&variant) {
            Ok(file) => {
                log::debug!("Using {} variant {}", encoding.token, variant);
                return Ok((file, Some(encoding)));
            }
            Err(e) => log::trace!("No {} variant at {}: {}", encoding.token, variant, e),
        }
    }

    fs.open(name).map(|file| (file, None))
}
