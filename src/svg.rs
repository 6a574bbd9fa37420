//! Minimal typed SVG builder used by the plot renderers.
//!
//! Elements are plain values; nothing here touches global state. A [`Document`] serializes its
//! content in exactly the order it was given, so callers are responsible for layering (grid under
//! ticks under data under text).

use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;

/// A point in pixel space.
pub type Point = (f64, f64);

#[derive(Debug, PartialEq)]
/// Enum representing the structural errors the markup layer can report
pub enum MarkupError {
    EmptyPath,
    InvalidCanvas(usize),
    ZeroSizedCanvas,
}
impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupError::EmptyPath => write!(f, "A path needs at least one point."),
            MarkupError::InvalidCanvas(dimensions) => write!(
                f,
                "Display must be a width/height pair, but {} values were given.",
                dimensions
            ),
            MarkupError::ZeroSizedCanvas => {
                write!(f, "Display width and height must both be non-zero.")
            }
        }
    }
}
impl std::error::Error for MarkupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

fn escape_text(text: &str) -> Cow<'_, str> {
    if !text.contains(|c: char| matches!(c, '&' | '<' | '>')) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    )
}

fn escape_attribute(value: &str) -> Cow<'_, str> {
    match escape_text(value) {
        Cow::Borrowed(value) if !value.contains('"') => Cow::Borrowed(value),
        escaped => Cow::Owned(escaped.replace('"', "&quot;")),
    }
}

fn class_list(classes: &[&str]) -> Vec<String> {
    classes.iter().map(|&class| class.to_owned()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Path {
        points: Vec<Point>,
        classes: Vec<String>,
    },
    Circle {
        center: Point,
        radius: f64,
        classes: Vec<String>,
    },
    Text {
        content: String,
        position: Point,
        classes: Vec<String>,
    },
}
impl Element {
    pub fn classes(&self) -> &[String] {
        match self {
            Element::Path { classes, .. }
            | Element::Circle { classes, .. }
            | Element::Text { classes, .. } => classes,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }
}
impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Path { points, classes } => {
                write!(f, "<path class=\"{}\" d=\"", escape_attribute(&classes.join(" ")))?;
                for (i, (x, y)) in points.iter().enumerate() {
                    let command = if i == 0 { "M" } else { " L" };
                    write!(f, "{} {},{}", command, x, y)?;
                }
                write!(f, "\"/>")
            }
            Element::Circle {
                center: (x, y),
                radius,
                classes,
            } => write!(
                f,
                "<circle class=\"{}\" cx=\"{}\" cy=\"{}\" r=\"{}\"/>",
                escape_attribute(&classes.join(" ")),
                x,
                y,
                radius
            ),
            Element::Text {
                content,
                position: (x, y),
                classes,
            } => write!(
                f,
                "<text x=\"{}\" y=\"{}\" class=\"{}\">{}</text>",
                x,
                y,
                escape_attribute(&classes.join(" ")),
                escape_text(content)
            ),
        }
    }
}

/// Polyline through `points`, in order.
pub fn path<I>(points: I, classes: &[&str]) -> Result<Element, MarkupError>
where
    I: IntoIterator<Item = Point>,
{
    let points: Vec<Point> = points.into_iter().collect();
    if points.is_empty() {
        return Err(MarkupError::EmptyPath);
    }
    Ok(Element::Path {
        points,
        classes: class_list(classes),
    })
}

pub fn circle(center: Point, radius: f64, classes: &[&str]) -> Element {
    Element::Circle {
        center,
        radius,
        classes: class_list(classes),
    }
}

/// Text anchored at `position`. Anchoring and baseline are left to the stylesheet.
pub fn text<S: Into<String>>(content: S, position: Point, classes: &[&str]) -> Element {
    Element::Text {
        content: content.into(),
        position,
        classes: class_list(classes),
    }
}

/// One CSS rule: a selector (which may itself be a comma-separated group) and its declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    selector: String,
    declarations: Vec<(String, String)>,
}
impl Rule {
    pub fn new<S: Into<String>>(selector: S) -> Rule {
        Rule {
            selector: selector.into(),
            declarations: vec![],
        }
    }

    pub fn declare<P: Into<String>, V: Into<String>>(mut self, property: P, value: V) -> Rule {
        self.declarations.push((property.into(), value.into()));
        self
    }
}
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.selector)?;
        writeln!(f, "{{")?;
        for (property, value) in &self.declarations {
            writeln!(f, "    {}: {};", property, value)?;
        }
        writeln!(f, "}}")
    }
}

/// Static rule table: selector plus `(property, value)` pairs.
pub type StaticRules = &'static [(&'static str, &'static [(&'static str, &'static str)])];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}
impl Stylesheet {
    pub fn new() -> Stylesheet {
        Stylesheet { rules: vec![] }
    }

    pub fn with_static(mut self, rules: StaticRules) -> Stylesheet {
        for (selector, declarations) in rules {
            let rule = declarations
                .iter()
                .fold(Rule::new(*selector), |rule, (property, value)| {
                    rule.declare(*property, *value)
                });
            self.rules.push(rule);
        }
        self
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}
impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            write!(f, "{}", rule)?;
        }
        Ok(())
    }
}

/// Fixed pixel size of an output document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}
impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Canvas, MarkupError> {
        if width == 0 || height == 0 {
            return Err(MarkupError::ZeroSizedCanvas);
        }
        Ok(Canvas { width, height })
    }
}
impl TryFrom<&[u32]> for Canvas {
    type Error = MarkupError;

    fn try_from(display: &[u32]) -> Result<Canvas, MarkupError> {
        match *display {
            [width, height] => Canvas::new(width, height),
            _ => Err(MarkupError::InvalidCanvas(display.len())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    canvas: Canvas,
    style: Stylesheet,
    content: Vec<Element>,
}
impl Document {
    pub fn new(canvas: Canvas, style: Stylesheet, content: Vec<Element>) -> Document {
        Document {
            canvas,
            style,
            content,
        }
    }

    pub fn style(&self) -> &Stylesheet {
        &self.style
    }

    pub fn content(&self) -> &[Element] {
        &self.content
    }
}
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Canvas { width, height } = self.canvas;
        writeln!(f, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(f, r#"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN""#)?;
        writeln!(f, r#"  "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">"#)?;
        writeln!(
            f,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{0}" height="{1}" viewBox="0 0 {0} {1}">"#,
            width, height
        )?;
        writeln!(f, r#"<style type="text/css">"#)?;
        writeln!(f, "<![CDATA[")?;
        write!(f, "{}", self.style)?;
        writeln!(f, "]]>")?;
        writeln!(f, "</style>")?;
        writeln!(
            f,
            r#"    <rect width="{}" height="{}" class="background"/>"#,
            width, height
        )?;
        for element in &self.content {
            writeln!(f, "    {}", element)?;
        }
        writeln!(f, "</svg>")
    }
}

/// Wraps `content` and `style` into a standalone document. `display` must be exactly a
/// `[width, height]` pair.
pub fn document(
    display: &[u32],
    style: Stylesheet,
    content: Vec<Element>,
) -> Result<Document, MarkupError> {
    let canvas = Canvas::try_from(display)?;
    Ok(Document::new(canvas, style, content))
}
