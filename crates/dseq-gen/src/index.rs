use tracing::warn;

/// Registry offset for entity-indexed optical properties.
///
/// Soil records occupy slots `[0, offset)` of the shared Lambertian registry
/// when multi-soil mode found at least one valid variant; entity records
/// follow immediately after.
pub fn resolve_offset(multi_soil_enabled: bool, valid_soil_count: usize) -> usize {
    if !multi_soil_enabled {
        return 0;
    }
    if valid_soil_count == 0 {
        warn!("multi-soil mode requested but no valid soil variant found; using offset 0 and the default soil");
        return 0;
    }
    valid_soil_count
}
