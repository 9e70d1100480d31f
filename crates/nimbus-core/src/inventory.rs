//! Plain-text host inventory: an ungrouped host list followed by `[group]`
//! sections, each host line being `<host> key=value ...`.

use crate::errors::InventoryError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostVars(Vec<(String, String)>);

impl HostVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps first-seen order; a repeated key replaces the earlier value.
    pub fn insert(&mut self, key: String, value: String) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HostVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = HostVars::new();
        for (k, v) in iter {
            vars.insert(k.into(), v.into());
        }
        vars
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryHost {
    pub host: String,
    pub variables: HostVars,
}

impl InventoryHost {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            variables: HostVars::new(),
        }
    }

    /// Returns `None` for a line without any token.
    fn parse_line(line: &str) -> Result<Option<Self>, InventoryError> {
        let mut tokens = line.split_whitespace();
        let Some(host) = tokens.next() else {
            return Ok(None);
        };

        let mut variables = HostVars::new();
        for token in tokens {
            match token.split_once('=') {
                Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                    variables.insert(key.to_string(), value.to_string());
                }
                _ => {
                    return Err(InventoryError::MalformedVariable {
                        token: token.to_string(),
                        host: host.to_string(),
                    })
                }
            }
        }

        Ok(Some(Self {
            host: host.to_string(),
            variables,
        }))
    }
}

impl fmt::Display for InventoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host)?;
        for (key, value) in self.variables.iter() {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryGroup {
    pub name: String,
    pub hosts: Vec<InventoryHost>,
}

impl InventoryGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosts: Vec::new(),
        }
    }

    fn is_heading(line: &str) -> bool {
        line.starts_with('[') && !line.contains(':')
    }

    fn from_heading(line: &str) -> Self {
        let heading = line.trim();
        let name = heading.strip_prefix('[').unwrap_or(heading);
        let name = name.strip_suffix(']').unwrap_or(name);
        Self::new(name)
    }
}

impl fmt::Display for InventoryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.name)?;
        let lines: Vec<String> = self.hosts.iter().map(|h| h.to_string()).collect();
        writeln!(f, "{}", lines.join("\n"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub global_hosts: Vec<InventoryHost>,
    pub groups: Vec<InventoryGroup>,
}

impl Inventory {
    pub fn from_path(path: &Path) -> Result<Self, InventoryError> {
        let content = fs_err::read_to_string(path).map_err(|e| InventoryError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        content.parse()
    }

    pub fn group(&self, name: &str) -> Option<&InventoryGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    fn is_ignored(line: &str) -> bool {
        line.trim().is_empty() || line.starts_with('#')
    }
}

impl FromStr for Inventory {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut inventory = Inventory::default();
        let mut current: Option<InventoryGroup> = None;

        for line in s.lines() {
            if Inventory::is_ignored(line) {
                continue;
            }

            if InventoryGroup::is_heading(line) {
                if let Some(done) = current.take() {
                    inventory.groups.push(done);
                }
                current = Some(InventoryGroup::from_heading(line));
                continue;
            }

            if let Some(host) = InventoryHost::parse_line(line)? {
                match current.as_mut() {
                    Some(group) => group.hosts.push(host),
                    None => inventory.global_hosts.push(host),
                }
            }
        }

        if let Some(done) = current {
            inventory.groups.push(done);
        }

        Ok(inventory)
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for host in &self.global_hosts {
            writeln!(f, "{}", host)?;
        }

        if !self.groups.is_empty() {
            writeln!(f)?;
            let sections: Vec<String> = self.groups.iter().map(|g| g.to_string()).collect();
            writeln!(f, "{}", sections.join("\n"))?;
        }

        Ok(())
    }
}
