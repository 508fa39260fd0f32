//! Navigation surface
//!
//! A static table mapping URL-style paths to lazily instantiated view
//! components, annotated with the display metadata the sidebar menu
//! renders. Pure configuration; the only logic is lookup.

/// View components, instantiated by the shell on first navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    DeviceConnect,
    DeviceDetail,
    Flash,
    PatchBoot,
    Backup,
    Extract,
    Apps,
    Root,
    ApkInspector,
    PropEditor,
    ActivityLauncher,
    Permissions,
    Battery,
    ProxySettings,
    NetworkDiagnostics,
    Logcat,
    Performance,
    SecurityScan,
    Shell,
    SavedCommands,
    FileTransfer,
    ScreenMirror,
    Settings,
}

/// Sidebar menu sections, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCategory {
    Device,
    System,
    Apps,
    Tools,
    Network,
    Debugging,
    Files,
    Settings,
}

impl NavCategory {
    pub fn label(self) -> &'static str {
        match self {
            NavCategory::Device => "Device",
            NavCategory::System => "System",
            NavCategory::Apps => "Apps",
            NavCategory::Tools => "Tools",
            NavCategory::Network => "Network",
            NavCategory::Debugging => "Debugging",
            NavCategory::Files => "Files",
            NavCategory::Settings => "Settings",
        }
    }
}

/// One navigation entry: path, route name, view, and menu metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavEntry {
    pub path: &'static str,
    pub name: &'static str,
    pub view: View,
    pub title: &'static str,
    pub icon: &'static str,
    pub category: NavCategory,
}

/// The root path redirects here
pub const DEFAULT_PATH: &str = "/device";

pub const NAV_ENTRIES: &[NavEntry] = &[
    NavEntry {
        path: "/device",
        name: "device",
        view: View::DeviceConnect,
        title: "Device Connection",
        icon: "📱",
        category: NavCategory::Device,
    },
    NavEntry {
        path: "/device-info",
        name: "device-info",
        view: View::DeviceDetail,
        title: "Device Details",
        icon: "📋",
        category: NavCategory::Device,
    },
    NavEntry {
        path: "/flash",
        name: "flash",
        view: View::Flash,
        title: "Flashing",
        icon: "💾",
        category: NavCategory::System,
    },
    NavEntry {
        path: "/patch-boot",
        name: "patch-boot",
        view: View::PatchBoot,
        title: "Boot Patcher",
        icon: "🔧",
        category: NavCategory::System,
    },
    NavEntry {
        path: "/backup",
        name: "backup",
        view: View::Backup,
        title: "Backup & Restore",
        icon: "💿",
        category: NavCategory::System,
    },
    NavEntry {
        path: "/extract",
        name: "extract",
        view: View::Extract,
        title: "ROM Extraction",
        icon: "📦",
        category: NavCategory::System,
    },
    NavEntry {
        path: "/apps",
        name: "apps",
        view: View::Apps,
        title: "App Manager",
        icon: "📦",
        category: NavCategory::Apps,
    },
    NavEntry {
        path: "/root",
        name: "root",
        view: View::Root,
        title: "Root Manager",
        icon: "🔓",
        category: NavCategory::Apps,
    },
    NavEntry {
        path: "/apk-info",
        name: "apk-info",
        view: View::ApkInspector,
        title: "APK Inspector",
        icon: "🔍",
        category: NavCategory::Apps,
    },
    NavEntry {
        path: "/prop",
        name: "prop",
        view: View::PropEditor,
        title: "Prop Editor",
        icon: "📝",
        category: NavCategory::Tools,
    },
    NavEntry {
        path: "/activity",
        name: "activity",
        view: View::ActivityLauncher,
        title: "Activity Launcher",
        icon: "🎯",
        category: NavCategory::Tools,
    },
    NavEntry {
        path: "/permission",
        name: "permission",
        view: View::Permissions,
        title: "Permissions",
        icon: "🔒",
        category: NavCategory::Tools,
    },
    NavEntry {
        path: "/battery",
        name: "battery",
        view: View::Battery,
        title: "Battery",
        icon: "🔋",
        category: NavCategory::Tools,
    },
    NavEntry {
        path: "/proxy",
        name: "proxy",
        view: View::ProxySettings,
        title: "Proxy Settings",
        icon: "🌐",
        category: NavCategory::Network,
    },
    NavEntry {
        path: "/network",
        name: "network",
        view: View::NetworkDiagnostics,
        title: "Network Diagnostics",
        icon: "📶",
        category: NavCategory::Network,
    },
    NavEntry {
        path: "/logcat",
        name: "logcat",
        view: View::Logcat,
        title: "Logcat",
        icon: "📡",
        category: NavCategory::Debugging,
    },
    NavEntry {
        path: "/perf",
        name: "perf",
        view: View::Performance,
        title: "Performance",
        icon: "📊",
        category: NavCategory::Debugging,
    },
    NavEntry {
        path: "/security",
        name: "security",
        view: View::SecurityScan,
        title: "Security Scan",
        icon: "🛡️",
        category: NavCategory::Debugging,
    },
    NavEntry {
        path: "/shell",
        name: "shell",
        view: View::Shell,
        title: "Shell Terminal",
        icon: "💻",
        category: NavCategory::Debugging,
    },
    NavEntry {
        path: "/favorites",
        name: "favorites",
        view: View::SavedCommands,
        title: "Saved Commands",
        icon: "⭐",
        category: NavCategory::Debugging,
    },
    NavEntry {
        path: "/file",
        name: "file",
        view: View::FileTransfer,
        title: "File Transfer",
        icon: "📂",
        category: NavCategory::Files,
    },
    NavEntry {
        path: "/screen",
        name: "screen",
        view: View::ScreenMirror,
        title: "Screen Mirroring",
        icon: "🖥️",
        category: NavCategory::Files,
    },
    NavEntry {
        path: "/settings",
        name: "settings",
        view: View::Settings,
        title: "Settings",
        icon: "⚙️",
        category: NavCategory::Settings,
    },
];

/// Resolve a path to its navigation entry; `/` redirects to the
/// device-connection view.
pub fn resolve(path: &str) -> Option<&'static NavEntry> {
    let path = if path == "/" { DEFAULT_PATH } else { path };
    NAV_ENTRIES.iter().find(|entry| entry.path == path)
}

/// Menu sections in table order: each category paired with its entries
pub fn menu() -> Vec<(NavCategory, Vec<&'static NavEntry>)> {
    let mut sections: Vec<(NavCategory, Vec<&'static NavEntry>)> = Vec::new();

    for entry in NAV_ENTRIES {
        match sections.last_mut() {
            Some((category, entries)) if *category == entry.category => entries.push(entry),
            _ => sections.push((entry.category, vec![entry])),
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_root_redirects_to_device_connection() {
        let entry = resolve("/").unwrap();
        assert_eq!(entry.path, DEFAULT_PATH);
        assert_eq!(entry.view, View::DeviceConnect);
    }

    #[test]
    fn test_resolve_known_and_unknown_paths() {
        assert_eq!(resolve("/logcat").unwrap().view, View::Logcat);
        assert_eq!(resolve("/flash").unwrap().title, "Flashing");
        assert!(resolve("/missing").is_none());
    }

    #[test]
    fn test_paths_and_names_are_unique() {
        let paths: HashSet<_> = NAV_ENTRIES.iter().map(|e| e.path).collect();
        let names: HashSet<_> = NAV_ENTRIES.iter().map(|e| e.name).collect();
        assert_eq!(paths.len(), NAV_ENTRIES.len());
        assert_eq!(names.len(), NAV_ENTRIES.len());
    }

    #[test]
    fn test_menu_groups_preserve_order() {
        let sections = menu();

        // Categories are contiguous in the table, so each appears once
        let categories: Vec<_> = sections.iter().map(|(c, _)| *c).collect();
        let unique: HashSet<_> = categories
            .iter()
            .map(|c| std::mem::discriminant(c))
            .collect();
        assert_eq!(unique.len(), categories.len());

        assert_eq!(categories.first(), Some(&NavCategory::Device));
        assert_eq!(categories.last(), Some(&NavCategory::Settings));

        // Every entry lands in exactly one section
        let total: usize = sections.iter().map(|(_, entries)| entries.len()).sum();
        assert_eq!(total, NAV_ENTRIES.len());
    }

    #[test]
    fn test_every_entry_has_display_metadata() {
        for entry in NAV_ENTRIES {
            assert!(!entry.title.is_empty(), "{} has no title", entry.path);
            assert!(!entry.icon.is_empty(), "{} has no icon", entry.path);
            assert!(!entry.category.label().is_empty());
        }
    }
}
