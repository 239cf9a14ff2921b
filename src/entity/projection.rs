use serde::Serialize;
use serde_json::Value;

/// Which response shape a caller wants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Detail,
    ListItem,
    /// Detail plus an asset reference already resolved by the caller
    DetailWithAsset(Option<String>),
}

/// Caller-facing views of an entity. Secrets are never part of any view.
pub trait Projectable {
    type Detail: Serialize;
    type ListItem: Serialize;

    fn detail_view(&self) -> Self::Detail;

    fn list_item_view(&self) -> Self::ListItem;

    /// Entities without an external asset return the plain detail view.
    fn detail_with_asset(&self, asset: Option<String>) -> Self::Detail {
        let _ = asset;
        self.detail_view()
    }

    fn project(&self, projection: Projection) -> Result<Value, serde_json::Error> {
        match projection {
            Projection::Detail => serde_json::to_value(self.detail_view()),
            Projection::ListItem => serde_json::to_value(self.list_item_view()),
            Projection::DetailWithAsset(asset) => serde_json::to_value(self.detail_with_asset(asset)),
        }
    }
}

/// One list item per entity, same order
pub fn list_item_views<T: Projectable>(entities: &[T]) -> Vec<T::ListItem> {
    entities.iter().map(Projectable::list_item_view).collect()
}

/// Drop blank optional values so views omit them instead of emitting ""
pub(crate) fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}
