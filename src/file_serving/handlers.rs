use crate::compression::Encoding;
use crate::config::StaticConfig;
use crate::error::ServeError;
use crate::fs::{Dir, FileHandle, FileInfo, FileSystem};
use crate::http::{Handler, Request, Response};

use super::content::serve_content;
use super::opener::open_encoded;
use super::path_utils::{base_name, document_path, join_path};
use super::OpenedDocument;

/// Static mount: serves documents from a filesystem, preferring precompressed
/// variants, and hands misses to `next`.
pub struct StaticFiles<F: FileSystem = Dir> {
    config: StaticConfig,
    fs: F,
    next: Box<dyn Handler>,
}

impl StaticFiles<Dir> {
    /// Serves `config.root` from the local disk.
    pub fn new(config: StaticConfig, next: Box<dyn Handler>) -> Result<Self, ServeError> {
        let config = config.validated()?;
        let fs = Dir::new(&config.root);
        Ok(Self { config, fs, next })
    }
}

impl<F: FileSystem> StaticFiles<F> {
    pub fn with_filesystem(
        config: StaticConfig,
        fs: F,
        next: Box<dyn Handler>,
    ) -> Result<Self, ServeError> {
        Ok(Self {
            config: config.validated()?,
            fs,
            next,
        })
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    fn root_index(&self) -> String {
        join_path("/", &self.config.index)
    }

    fn open(
        &self,
        path: &str,
        accept_encoding: Option<&str>,
    ) -> Result<(F::File, FileInfo, Option<Encoding>), ServeError> {
        let (file, encoding) = open_encoded(&self.fs, path, accept_encoding, &self.config.encodings)
            .map_err(|e| ServeError::from_io(path, e))?;
        let info = file.info().map_err(|source| ServeError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok((file, info, encoding.cloned()))
    }

    fn document(
        path: &str,
        file: F::File,
        info: FileInfo,
        encoding: Option<Encoding>,
    ) -> OpenedDocument<F::File> {
        OpenedDocument {
            file,
            path: path.to_string(),
            name: base_name(path).to_string(),
            info,
            encoding,
        }
    }

    /// Opens an index document; a directory in its place counts as missing.
    fn open_index(
        &self,
        path: &str,
        accept_encoding: Option<&str>,
    ) -> Result<OpenedDocument<F::File>, ServeError> {
        let (file, info, encoding) = self.open(path, accept_encoding)?;
        if info.is_dir {
            return Err(ServeError::DirectoryWithoutIndex {
                path: path.to_string(),
                index: self.config.index.clone(),
            });
        }
        Ok(Self::document(path, file, info, encoding))
    }

    fn resolve(
        &self,
        path: &str,
        accept_encoding: Option<&str>,
    ) -> Result<OpenedDocument<F::File>, ServeError> {
        let (file, info, encoding) = self.open(path, accept_encoding)?;
        if !info.is_dir {
            return Ok(Self::document(path, file, info, encoding));
        }
        drop(file);

        // SPA mounts have a single document; per-directory indexes are ignored.
        let index = match self.config.spa {
            Some(_) => self.root_index(),
            None => join_path(path, &self.config.index),
        };
        log::debug!("{} is a directory, trying {}", path, index);

        match self.open_index(&index, accept_encoding) {
            Err(e) if e.is_not_found() => Err(ServeError::DirectoryWithoutIndex {
                path: path.to_string(),
                index: self.config.index.clone(),
            }),
            result => result,
        }
    }

    fn defer(
        &self,
        request: &Request,
        path: &str,
        accept_encoding: Option<&str>,
        cause: ServeError,
    ) -> Result<Response, ServeError> {
        log::debug!("{}; deferring to next handler", cause);
        match self.next.handle(request) {
            Ok(response) => return Ok(response),
            Err(e) if e.is_not_found() => log::trace!("Next handler missed too: {}", e),
            Err(e) => return Err(e),
        }

        let Some(spa) = &self.config.spa else {
            return Err(cause);
        };
        // A directory miss under SPA already means the root index is unusable.
        let index_tried = matches!(cause, ServeError::DirectoryWithoutIndex { .. });
        if index_tried || !spa.applies_to(path) {
            return Err(cause);
        }

        let index = self.root_index();
        log::debug!("SPA fallback from {} to {}", path, index);
        let document = self.open_index(&index, accept_encoding)?;
        self.serve(request, document)
    }

    fn serve(
        &self,
        request: &Request,
        document: OpenedDocument<F::File>,
    ) -> Result<Response, ServeError> {
        let OpenedDocument {
            file,
            path,
            name,
            info,
            encoding,
        } = document;

        let mut response = serve_content(request, file, &name, info.modified, info.len)
            .map_err(|source| ServeError::Io {
                path: path.clone(),
                source,
            })?;

        if let Some(encoding) = &encoding {
            response.set_header("Content-Encoding", &encoding.token);
        }
        if !self.config.encodings.is_empty() {
            response.set_header("Vary", "Accept-Encoding");
        }
        if path == self.root_index() {
            response.set_header("Cache-Control", "no-cache");
        }
        log::debug!(
            "Served {} as {} ({})",
            path,
            name,
            encoding.as_ref().map_or("identity", |e| e.token.as_str())
        );
        Ok(response)
    }
}

impl<F: FileSystem> Handler for StaticFiles<F> {
    fn handle(&self, request: &Request) -> Result<Response, ServeError> {
        if (self.config.skipper)(request) {
            log::debug!("Skipping static lookup for {}", request.path);
            return self.next.handle(request);
        }

        let path = document_path(request, &self.config)?;
        let accept_encoding = request.header("Accept-Encoding");

        match self.resolve(&path, accept_encoding) {
            Ok(document) => self.serve(request, document),
            Err(cause) if cause.is_not_found() => {
                self.defer(request, &path, accept_encoding, cause)
            }
            Err(e) => Err(e),
        }
    }
}
