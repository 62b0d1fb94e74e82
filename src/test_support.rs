// src/test_support.rs
//! XML fixture builder for uiautomator-style dumps used across unit tests.

pub const SCREEN_W: i32 = 1080;
pub const SCREEN_H: i32 = 2400;

#[derive(Debug, Clone, Default)]
pub struct Node {
    class: String,
    text: String,
    desc: String,
    id: String,
    bounds: Option<String>,
    clickable: bool,
    children: Vec<Node>,
}

impl Node {
    pub fn new(class: &str) -> Self {
        Self { class: class.to_string(), ..Default::default() }
    }

    pub fn text_view(text: &str, x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new("android.widget.TextView").text(text).bounds(x1, y1, x2, y2)
    }

    pub fn button(label: &str, x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new("android.widget.Button").text(label).bounds(x1, y1, x2, y2).clickable()
    }

    pub fn list(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new("androidx.recyclerview.widget.RecyclerView").bounds(x1, y1, x2, y2)
    }

    pub fn card(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new("android.view.ViewGroup").bounds(x1, y1, x2, y2).clickable()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn desc(mut self, desc: &str) -> Self {
        self.desc = desc.to_string();
        self
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn bounds(mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        self.bounds = Some(format!("[{},{}][{},{}]", x1, y1, x2, y2));
        self
    }

    pub fn raw_bounds(mut self, raw: &str) -> Self {
        self.bounds = Some(raw.to_string());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: Vec<Node>) -> Self {
        self.children.extend(children);
        self
    }

    fn write(&self, out: &mut String) {
        out.push_str(&format!(
            r#"<node index="0" text="{}" resource-id="{}" class="{}" package="com.autonavi.minimap" content-desc="{}" clickable="{}""#,
            escape(&self.text),
            escape(&self.id),
            escape(&self.class),
            escape(&self.desc),
            self.clickable
        ));
        if let Some(bounds) = &self.bounds {
            out.push_str(&format!(r#" bounds="{}""#, escape(bounds)));
        }
        if self.children.is_empty() {
            out.push_str(" />");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write(out);
        }
        out.push_str("</node>");
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wraps nodes in a `<hierarchy>` document under a full-screen frame.
pub fn screen(nodes: Vec<Node>) -> String {
    hierarchy(vec![Node::new("android.widget.FrameLayout")
        .bounds(0, 0, SCREEN_W, SCREEN_H)
        .children(nodes)])
}

/// Wraps nodes in a bare `<hierarchy>` document.
pub fn hierarchy(nodes: Vec<Node>) -> String {
    let mut out = String::from(r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation="0">"#);
    for node in &nodes {
        node.write(&mut out);
    }
    out.push_str("</hierarchy>");
    out
}
