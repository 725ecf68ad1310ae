use crate::config::{normalize_process_name, AppBinding, Config};
use crate::events::window::GroupWindows;
use crate::events::{AppGroup, GroupedApps, Launcher, WindowRecord};
use std::collections::{BTreeMap, HashSet};

const ORDINAL_KEYS: [char; 9] = ['1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Построить группы приложений из результата сканирования.
///
/// Чистая функция: одинаковые входные данные дают одинаковый результат.
/// Порядок: настроенные привязки в порядке конфигурации, затем остальные
/// группы по имени процесса с порядковыми цифрами. Цифры, занятые
/// привязками, порядковым группам не выдаются.
pub fn build_groups(records: &[WindowRecord], config: &Config) -> GroupedApps {
    let bindings: Vec<(&AppBinding, String)> = config
        .apps
        .iter()
        .map(|app| (app, app.normalized_name()))
        .collect();
    let whitelist = config
        .switcher
        .whitelist_mode
        .then(|| config.whitelisted_names());
    let reserved = config.bound_keys();

    // Имя группы -> индексы окон в порядке Z
    let mut by_name: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        let name = normalize_process_name(&record.process_name);
        if whitelist.as_ref().is_some_and(|names| !names.contains(&name)) {
            continue;
        }
        by_name.entry(name).or_default().push(index);
    }

    let mut result = GroupedApps::default();
    let mut used: HashSet<&str> = HashSet::new();

    for (binding, binding_name) in &bindings {
        let Some(key) = binding.key() else {
            continue;
        };

        // "steam" покрывает и "steamwebhelper"
        let mut indices: Vec<usize> = Vec::new();
        for (name, group) in &by_name {
            if name.starts_with(binding_name.as_str()) && !used.contains(name.as_str()) {
                used.insert(name.as_str());
                indices.extend_from_slice(group);
            }
        }

        if indices.is_empty() {
            result.launchers.push(Launcher {
                key,
                process_name: binding_name.clone(),
                launch_path: binding.launch_path.clone(),
            });
            continue;
        }

        indices.sort_unstable();
        result.groups.push(AppGroup {
            key: Some(key),
            process_name: binding_name.clone(),
            windows: collect_windows(records, &indices),
            launch_path: binding.launch_path.clone(),
        });
    }

    // BTreeMap уже упорядочен по имени
    let mut ordinals = ORDINAL_KEYS
        .iter()
        .copied()
        .filter(|key| !reserved.contains(key));
    for (name, indices) in &by_name {
        if used.contains(name.as_str()) {
            continue;
        }
        result.groups.push(AppGroup {
            key: ordinals.next(),
            process_name: name.clone(),
            windows: collect_windows(records, indices),
            launch_path: None,
        });
    }

    result
}

fn collect_windows(records: &[WindowRecord], indices: &[usize]) -> GroupWindows {
    indices.iter().map(|&i| records[i].clone()).collect()
}
