//! Workers shipped with the binary, registered under the `builtin` library.

use bb_action::{ActionResult, Registry};
use bb_memory::StoreError;
use bb_types::words;
use bb_view::{entry, slot, View, ViewError};

pub const LIBRARY: &str = "builtin";

pub fn registry() -> ActionResult<Registry> {
    let mut registry = Registry::new();
    registry.register(LIBRARY, "heartbeat", heartbeat)?;
    registry.register(LIBRARY, "spread", spread)?;
    Ok(registry)
}

/// Nothing stored yet under the requested words.
fn is_missing(e: &ViewError) -> bool {
    matches!(
        e,
        ViewError::Store(StoreError::NotFound { .. } | StoreError::UnknownWord(_))
    )
}

/// Increment the counter at `{heartbeat}`.
pub fn heartbeat(view: &View) -> anyhow::Result<()> {
    let beat: u64 = match view.get(slot(words!["heartbeat"])) {
        Ok(beat) => beat,
        Err(e) if is_missing(&e) => 0,
        Err(e) => return Err(e.into()),
    };
    view.set(entry(words!["heartbeat"], beat + 1))?;
    Ok(())
}

/// For every asset listed at `{assets}`, write `ask - bid` to
/// `{asset, total, spread}`. Assets without both quotes are skipped.
pub fn spread(view: &View) -> anyhow::Result<()> {
    let assets: Vec<String> = match view.get(slot(words!["assets"])) {
        Ok(assets) => assets,
        Err(e) if is_missing(&e) => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for asset in &assets {
        let quotes = view.get((
            slot::<f64>(words![asset.as_str(), "total", "ask"]),
            slot::<f64>(words![asset.as_str(), "total", "bid"]),
        ));
        let (ask, bid) = match quotes {
            Ok(quotes) => quotes,
            Err(e) if is_missing(&e) => continue,
            Err(e) => return Err(e.into()),
        };
        view.set(entry(words![asset.as_str(), "total", "spread"], ask - bid))?;
    }
    Ok(())
}
