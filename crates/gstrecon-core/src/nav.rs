//! Navigation shell: the pages and their sidebar order.

use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Dashboard,
    Reconciliation,
    GraphView,
    VendorRisk,
    AuditTrail,
}

impl Page {
    /// Sidebar order.
    pub const ALL: [Page; 5] = [
        Page::Dashboard,
        Page::Reconciliation,
        Page::GraphView,
        Page::VendorRisk,
        Page::AuditTrail,
    ];

    pub fn route(&self) -> &'static str {
        match self {
            Self::Dashboard => "/",
            Self::Reconciliation => "/reconciliation",
            Self::GraphView => "/graph",
            Self::VendorRisk => "/vendors",
            Self::AuditTrail => "/audit-trail",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Reconciliation => "Reconciliation",
            Self::GraphView => "Knowledge Graph",
            Self::VendorRisk => "Vendor Risk",
            Self::AuditTrail => "Audit Trail",
        }
    }

    pub fn from_route(route: &str) -> Option<Self> {
        let route = route.trim_end_matches('/');
        let route = if route.is_empty() { "/" } else { route };
        Self::ALL.into_iter().find(|p| p.route() == route)
    }
}

/// Render the shell header for `active`. With `collapsed`, only the
/// breadcrumb is shown; otherwise the sidebar routes follow it with the
/// active page marked.
pub fn shell_header(active: Page, collapsed: bool) -> String {
    let mut out = format!("GST Reconciliation › {}\n", active.title());
    if !collapsed {
        for page in Page::ALL {
            let marker = if page == active { '▸' } else { ' ' };
            let _ = writeln!(out, " {marker} {:<16} {}", page.title(), page.route());
        }
    }
    out
}
