use crate::import::{ExternalTrackRecord, build_mix_from_import};
use crate::share;
use crate::store::{BlobStore, load_mixes, save_mixes};
use crate::templates;
use crate::timeline::{CreateMixOptions, Mix};

/// Owns the list of mixes for one editing session and writes every change
/// through the injected store.
///
/// Persistence failures are logged and the in-memory list stays
/// authoritative, so a broken store never interrupts editing.
pub struct MixLibrary<S: BlobStore> {
    store: S,
    mixes: Vec<Mix>,
}

impl<S: BlobStore> MixLibrary<S> {
    pub fn open(store: S) -> Self {
        let mixes = load_mixes(&store);
        tracing::debug!("library: loaded {} mixes", mixes.len());
        Self { store, mixes }
    }

    pub fn mixes(&self) -> &[Mix] {
        &self.mixes
    }

    pub fn get(&self, mix_id: &str) -> Option<&Mix> {
        self.mixes.iter().find(|m| m.id == mix_id)
    }

    fn persist(&self) {
        if let Err(e) = save_mixes(&self.store, &self.mixes) {
            tracing::warn!("library: failed to persist mixes: {e}");
        }
    }

    fn push(&mut self, mix: Mix) -> &Mix {
        self.mixes.push(mix);
        self.persist();
        &self.mixes[self.mixes.len() - 1]
    }

    pub fn create(&mut self, options: CreateMixOptions) -> &Mix {
        self.push(Mix::create(options))
    }

    pub fn create_from_template(&mut self, template_id: &str) -> Option<&Mix> {
        let template = templates::template(template_id)?;
        Some(self.push(template.create_mix()))
    }

    pub fn import_playlist(&mut self, name: &str, records: &[ExternalTrackRecord]) -> &Mix {
        self.push(build_mix_from_import(name, records))
    }

    /// Add the mix carried by a share token. A bad token leaves the library untouched.
    pub fn open_shared(&mut self, token: &str) -> Option<&Mix> {
        let payload = share::decode(token)?;
        Some(self.push(Mix::from_share_payload(payload)))
    }

    pub fn delete(&mut self, mix_id: &str) -> bool {
        let before = self.mixes.len();
        self.mixes.retain(|m| m.id != mix_id);
        let removed = self.mixes.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    pub fn delete_all(&mut self) {
        self.mixes.clear();
        self.persist();
    }

    /// Run a timeline operation on one mix and persist. `None` when the mix
    /// no longer exists.
    pub fn edit<R>(&mut self, mix_id: &str, op: impl FnOnce(&mut Mix) -> R) -> Option<R> {
        let mix = self.mixes.iter_mut().find(|m| m.id == mix_id)?;
        let result = op(mix);
        self.persist();
        Some(result)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
