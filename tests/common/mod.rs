#![allow(dead_code)]

//! Scripted in-memory stand-in for the browser collaborator. Nodes are
//! registered with the selector strings they answer to; network events and
//! response bodies are queued up front.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde_json::Value;

use tipfeed::browser::{Browser, ElementId, NetworkEvent};

#[derive(Default, Clone)]
pub struct FakeNode {
    pub matches: Vec<&'static str>,
    pub text: String,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<usize>,
}

#[derive(Default)]
pub struct FakeBrowser {
    pub nodes: Vec<FakeNode>,
    pub navigated: Vec<String>,
    pub scripts: Vec<String>,
    pub waits: Vec<Duration>,
    pub events: Vec<NetworkEvent>,
    pub bodies: HashMap<String, String>,
    pub fail_navigation: bool,
}

impl FakeBrowser {
    pub fn node(&mut self, matches: &[&'static str], text: &str) -> usize {
        self.nodes.push(FakeNode {
            matches: matches.to_vec(),
            text: text.to_string(),
            ..Default::default()
        });
        self.nodes.len() - 1
    }

    pub fn set_attr(&mut self, node: usize, name: &'static str, value: &str) {
        self.nodes[node].attrs.push((name, value.to_string()));
    }

    pub fn add_child(&mut self, parent: usize, child: usize) {
        self.nodes[parent].children.push(child);
    }

    pub fn push_event(&mut self, request_id: &str, url: &str, body: Option<&str>) {
        self.events.push(NetworkEvent {
            request_id: request_id.to_string(),
            url: url.to_string(),
        });
        if let Some(body) = body {
            self.bodies.insert(request_id.to_string(), body.to_string());
        }
    }

    fn selector_matches(&self, node: usize, selector: &str) -> bool {
        selector
            .split(',')
            .map(str::trim)
            .any(|s| self.nodes[node].matches.contains(&s))
    }

    fn collect_descendants(&self, node: usize, out: &mut Vec<usize>) {
        for &child in &self.nodes[node].children {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    fn node_index(el: &ElementId) -> Result<usize> {
        el.0.parse::<usize>().map_err(|_| anyhow!("bad element id"))
    }
}

impl Browser for FakeBrowser {
    fn navigate(&mut self, url: &str) -> Result<()> {
        if self.fail_navigation {
            return Err(anyhow!("site unreachable"));
        }
        self.navigated.push(url.to_string());
        Ok(())
    }

    fn wait_fixed(&mut self, wait: Duration) {
        self.waits.push(wait);
    }

    fn find_all(&mut self, selector: &str) -> Result<Vec<ElementId>> {
        Ok((0..self.nodes.len())
            .filter(|&i| self.selector_matches(i, selector))
            .map(|i| ElementId(i.to_string()))
            .collect())
    }

    fn find_in(&mut self, parent: &ElementId, selector: &str) -> Result<Vec<ElementId>> {
        let parent = Self::node_index(parent)?;
        let mut descendants = Vec::new();
        self.collect_descendants(parent, &mut descendants);
        Ok(descendants
            .into_iter()
            .filter(|&i| self.selector_matches(i, selector))
            .map(|i| ElementId(i.to_string()))
            .collect())
    }

    fn text(&mut self, el: &ElementId) -> Result<String> {
        let idx = Self::node_index(el)?;
        Ok(self.nodes[idx].text.clone())
    }

    fn attr(&mut self, el: &ElementId, name: &str) -> Result<Option<String>> {
        let idx = Self::node_index(el)?;
        Ok(self.nodes[idx]
            .attrs
            .iter()
            .find(|(attr_name, _)| *attr_name == name)
            .map(|(_, value)| value.clone()))
    }

    fn execute_script(&mut self, js: &str) -> Result<Value> {
        self.scripts.push(js.to_string());
        Ok(Value::Null)
    }

    fn performance_events(&mut self) -> Result<Vec<NetworkEvent>> {
        Ok(std::mem::take(&mut self.events))
    }

    fn response_body(&mut self, request_id: &str) -> Result<String> {
        self.bodies
            .get(request_id)
            .cloned()
            .ok_or_else(|| anyhow!("no body buffered for {request_id}"))
    }
}
