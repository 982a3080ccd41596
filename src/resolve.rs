use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::ids::{Identifier, MediaKind, Namespace};
use crate::tmdb::TmdbApi;
use crate::tvdb::TvdbApi;

/// Moves ids between namespaces, one hop at a time:
/// movie TMDb -> IMDb, show TMDb -> IMDb, show IMDb -> TVDb.
pub struct IdResolver<'a> {
    tmdb: &'a dyn TmdbApi,
    tvdb: &'a dyn TvdbApi,
}

impl<'a> IdResolver<'a> {
    pub fn new(tmdb: &'a dyn TmdbApi, tvdb: &'a dyn TvdbApi) -> Self {
        Self { tmdb, tvdb }
    }

    pub async fn resolve(&self, kind: MediaKind, from: &Identifier) -> ApiResult<Identifier> {
        let resolved = match (kind, from.namespace()) {
            (_, Namespace::Tmdb) => self.tmdb.imdb_id(kind, from).await?,
            (MediaKind::Show, Namespace::Imdb) => self.tvdb.series_id(from).await?,
            _ => {
                return Err(ApiError::bad_request(format!(
                    "No {} mapping from {}.",
                    kind.as_str(),
                    from.namespace().as_str()
                )))
            }
        };
        info!("Resolved {} {} -> {}", kind.as_str(), from, resolved);
        Ok(resolved)
    }
}
