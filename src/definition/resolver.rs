//! 继承解析
//!
//! 按声明顺序处理原始定义；父定义只在已解析的表中查找，
//! 因此子定义不能先于父定义出现，循环引用也会以缺失父定义的形式失败。

use super::{DefinitionTable, Params, RawDefinition, ResolvedDefinition};
use crate::errors::{FactoryError, Result};

/// 将原始定义序列展开为定义表，失败时不返回部分结果
pub fn resolve(raw: &[RawDefinition]) -> Result<DefinitionTable> {
    let mut table = DefinitionTable::new();

    for definition in raw {
        let resolved = resolve_against(&table, definition)?;
        log::debug!(
            "resolved service '{}' as '{}' ({} params)",
            resolved.name,
            resolved.type_name,
            resolved.params.len()
        );
        table.insert(resolved);
    }

    Ok(table)
}

/// 在已有定义表中解析单个原始定义
pub(crate) fn resolve_against(
    resolved: &DefinitionTable,
    raw: &RawDefinition,
) -> Result<ResolvedDefinition> {
    let Some(parent_name) = raw.extends.as_deref() else {
        let type_name = raw
            .type_name
            .clone()
            .ok_or_else(|| FactoryError::UntypedDefinition {
                name: raw.name.clone(),
            })?;
        return Ok(ResolvedDefinition::new(&raw.name, type_name, raw.params.clone()));
    };

    let parent = resolved
        .get(parent_name)
        .ok_or_else(|| FactoryError::DefinitionResolution {
            child: raw.name.clone(),
            missing_parent: parent_name.to_string(),
        })?;

    let mut params: Params = parent.params.clone();
    for (key, value) in &raw.params {
        params.insert(key.clone(), value.clone());
    }

    let type_name = raw
        .type_name
        .clone()
        .unwrap_or_else(|| parent.type_name.clone());

    Ok(ResolvedDefinition::new(&raw.name, type_name, params))
}
