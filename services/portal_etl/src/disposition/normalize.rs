//! Canonicalize free-text disposition labels

use std::fmt;

use serde::{Serialize, Serializer};

/// Canonical disposition vocabulary plus a title-cased catch-all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Disposition {
    Unspecified,
    PerpetualMemo,
    HoldOnMemoOrMonitor,
    RtvCloseout,
    RtvMelt,
    Other(String),
}

impl Disposition {
    pub fn as_str(&self) -> &str {
        match self {
            Disposition::Unspecified => "Unspecified",
            Disposition::PerpetualMemo => "Perpetual Memo",
            Disposition::HoldOnMemoOrMonitor => "Hold On Memo/Monitor",
            Disposition::RtvCloseout => "RTV - Closeout",
            Disposition::RtvMelt => "RTV - Melt",
            Disposition::Other(label) => label,
        }
    }

    pub fn is_rtv(&self) -> bool {
        matches!(self, Disposition::RtvCloseout | Disposition::RtvMelt)
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Disposition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Keys are lowercased with whitespace runs collapsed.
fn lookup(key: &str) -> Option<Disposition> {
    let disposition = match key {
        "unspecified" => Disposition::Unspecified,
        "perpetual memo" => Disposition::PerpetualMemo,
        "hold on memo/monitor" | "hold on memo / monitor" => Disposition::HoldOnMemoOrMonitor,
        "rtv closeout" | "rtv - closeout" | "rtv- closeout" | "rtv -closeout" | "rtv-closeout" => {
            Disposition::RtvCloseout
        }
        "rtv melt" | "rtv - melt" | "rtv- melt" | "rtv -melt" | "rtv-melt" => Disposition::RtvMelt,
        _ => return None,
    };
    Some(disposition)
}

/// Map a raw label onto the canonical vocabulary.
///
/// Blank or missing input is `Unspecified`. Unknown labels are title-cased
/// into `Other`. Feeding any output back in returns it unchanged.
pub fn normalize(label: Option<&str>) -> Disposition {
    let collapsed = label
        .unwrap_or("")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if collapsed.is_empty() {
        return Disposition::Unspecified;
    }

    lookup(&collapsed).unwrap_or_else(|| Disposition::Other(title_case(&collapsed)))
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
