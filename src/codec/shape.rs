//! Per-type binding tables
//!
//! A `Shape<T>` lists, in declaration order, how each field of `T` maps to
//! the wire. Shapes are built once per type on first use and are read-only
//! afterwards; see the `shape!` macro for how types declare them.

use std::collections::HashMap;
use std::fmt;

use crate::m3u::{positional, Tag, Value};

use super::extension::{self, Extensions};
use super::scalar::Scalar;
use super::TagValue;

/// How an attribute value is quoted when encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quote {
    Quote,
    NoQuote,
    /// Decided by the field's kind: strings, lists and timestamps are quoted
    #[default]
    Infer,
    /// Quoted, except for the enumerated value `NONE` (CLOSED-CAPTIONS)
    UnlessNone,
}

impl Quote {
    fn resolve(self, quoted_kind: bool) -> Quote {
        match self {
            Quote::Infer if quoted_kind => Quote::Quote,
            Quote::Infer => Quote::NoQuote,
            q => q,
        }
    }

    pub fn applies(self, text: &str) -> bool {
        match self {
            Quote::Quote => true,
            Quote::UnlessNone => text != "NONE",
            Quote::NoQuote | Quote::Infer => false,
        }
    }
}

/// Per-binding options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Opts {
    pub omit_empty: bool,
    pub quote: Quote,
}

impl Opts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the field when encoding if it holds its zero value.
    pub fn omit_empty(mut self) -> Self {
        self.omit_empty = true;
        self
    }

    pub fn quote(mut self) -> Self {
        self.quote = Quote::Quote;
        self
    }

    pub fn noquote(mut self) -> Self {
        self.quote = Quote::NoQuote;
        self
    }

    pub fn unless_none(mut self) -> Self {
        self.quote = Quote::UnlessNone;
        self
    }
}

/// Where an attribute binding lives inside its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// `KEY=VALUE`
    Key(&'static str),
    /// Zero-based positional argument (`$1` is `Arg(0)`)
    Arg(usize),
    /// First content line (`$file`)
    Line,
}

impl Slot {
    pub fn of(wire: &'static str) -> Slot {
        match wire {
            "" => Slot::Arg(0),
            "$file" => Slot::Line,
            _ => positional(wire).map_or(Slot::Key(wire), Slot::Arg),
        }
    }

    fn read(self, tag: &Tag) -> &str {
        match self {
            Slot::Key(k) => tag.flag(k),
            Slot::Arg(n) => tag.arg(n),
            Slot::Line => tag.line(),
        }
    }
}

type Get<T, R> = Box<dyn Fn(&T) -> R + Send + Sync>;
type Decode<T> = Box<dyn Fn(&mut T, &Tag) + Send + Sync>;
type Encode<T> = Box<dyn Fn(&T, &mut Vec<Tag>) + Send + Sync>;

pub(crate) enum Rule<T> {
    /// One text slot of the enclosing tag
    Attr {
        slot: Slot,
        get: Get<T, String>,
        set: Box<dyn Fn(&mut T, &str) + Send + Sync>,
        zero: Get<T, bool>,
    },
    /// One or more whole tags
    Tag {
        decode: Decode<T>,
        encode: Encode<T>,
        zero: Get<T, bool>,
    },
    /// Catch-all for tags no other binding claims
    Extra {
        sink: Box<dyn Fn(&mut T) -> &mut Extensions + Send + Sync>,
        view: Box<dyn Fn(&T) -> &Extensions + Send + Sync>,
    },
}

/// How one field of `T` maps to the wire.
pub struct Binding<T> {
    pub name: &'static str,
    pub omit_empty: bool,
    pub quote: Quote,
    /// Attribute of the enclosing tag, rather than a tag of its own
    pub attribute: bool,
    /// Repeatable: one tag per element. Other tag bindings keep the last
    /// occurrence.
    pub aggregate: bool,
    /// Promoted from an optional embedded substructure. Descriptive; shown
    /// in the `Debug` output of the binding.
    pub embedded: bool,
    pub(crate) rule: Rule<T>,
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("omit_empty", &self.omit_empty)
            .field("quote", &self.quote)
            .field("attribute", &self.attribute)
            .field("aggregate", &self.aggregate)
            .field("embedded", &self.embedded)
            .finish_non_exhaustive()
    }
}

impl<T> Binding<T> {
    /// Decode a tag claimed by this binding into `value`.
    pub fn decode(&self, value: &mut T, tag: &Tag) {
        match &self.rule {
            Rule::Attr { slot, set, .. } => set(value, slot.read(tag)),
            Rule::Tag { decode, .. } => decode(value, tag),
            Rule::Extra { sink, .. } => {
                if let Some(ext) = extension::construct(tag) {
                    sink(value).insert(tag.name.clone(), ext);
                }
            }
        }
    }

    /// Append this binding's tags to `out`.
    pub fn encode(&self, value: &T, out: &mut Vec<Tag>) {
        match &self.rule {
            Rule::Attr { .. } => {}
            Rule::Tag { encode, .. } => encode(value, out),
            Rule::Extra { view, .. } => {
                for (name, ext) in view(value) {
                    let mut tag = Tag::new(name.as_str());
                    ext.encode_tag(&mut tag);
                    out.push(tag);
                }
            }
        }
    }

    /// Write this binding's slot into the tag being built.
    pub fn encode_attr(&self, value: &T, tag: &mut Tag) {
        let Rule::Attr { slot, get, .. } = &self.rule else {
            return;
        };
        let text = get(value);
        if text.is_empty() {
            return;
        }
        match *slot {
            Slot::Key(k) => {
                let quoted = self.quote.applies(&text);
                tag.insert(
                    k,
                    Value {
                        text,
                        quoted,
                        wrapped: false,
                    },
                );
            }
            Slot::Arg(_) => tag.args.push(Value::new(text)),
            Slot::Line => tag.lines.push(text),
        }
    }

    pub fn is_zero(&self, value: &T) -> bool {
        match &self.rule {
            Rule::Attr { zero, .. } | Rule::Tag { zero, .. } => zero(value),
            Rule::Extra { view, .. } => view(value).is_empty(),
        }
    }
}

/// The binding table of one type.
pub struct Shape<T> {
    bindings: Vec<Binding<T>>,
    index: HashMap<&'static str, usize>,
    sink: Option<usize>,
}

impl<T: 'static> Shape<T> {
    pub fn builder() -> ShapeBuilder<T> {
        ShapeBuilder {
            bindings: Vec::new(),
        }
    }

    pub fn bindings(&self) -> &[Binding<T>] {
        &self.bindings
    }

    /// The binding that claims tags named `name`.
    pub fn get(&self, name: &str) -> Option<&Binding<T>> {
        self.index.get(name).map(|&i| &self.bindings[i])
    }

    /// The catch-all binding, if the type has one.
    pub fn sink(&self) -> Option<&Binding<T>> {
        self.sink.map(|i| &self.bindings[i])
    }
}

pub struct ShapeBuilder<T> {
    bindings: Vec<Binding<T>>,
}

impl<T: 'static> ShapeBuilder<T> {
    /// A scalar attribute, positional argument or content line.
    pub fn attr<V: Scalar + 'static>(
        mut self,
        wire: &'static str,
        opts: Opts,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.bindings.push(Binding {
            name: wire,
            omit_empty: opts.omit_empty,
            quote: opts.quote.resolve(V::QUOTED),
            attribute: true,
            aggregate: false,
            embedded: false,
            rule: Rule::Attr {
                slot: Slot::of(wire),
                get: Box::new(move |t: &T| {
                    let v = get(t);
                    if opts.omit_empty && v.is_zero() {
                        String::new()
                    } else {
                        v.format()
                    }
                }),
                set: Box::new(move |t: &mut T, text: &str| *get_mut(t) = V::parse(text)),
                zero: Box::new(move |t: &T| get(t).is_zero()),
            },
        });
        self
    }

    /// A standalone tag holding one value.
    pub fn tag<V: TagValue + 'static>(
        mut self,
        wire: &'static str,
        opts: Opts,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.bindings.push(Binding {
            name: wire,
            omit_empty: opts.omit_empty,
            quote: opts.quote,
            attribute: false,
            aggregate: false,
            embedded: false,
            rule: Rule::Tag {
                decode: Box::new(move |t: &mut T, tag: &Tag| get_mut(t).decode_tag(tag)),
                encode: Box::new(move |t: &T, out: &mut Vec<Tag>| {
                    let v = get(t);
                    if V::PRESENCE && v.is_empty() {
                        return;
                    }
                    let mut tag = Tag::new(wire);
                    v.encode_tag(&mut tag);
                    out.push(tag);
                }),
                zero: Box::new(move |t: &T| get(t).is_empty()),
            },
        });
        self
    }

    /// A repeatable tag: every occurrence appends one element.
    pub fn each<V: TagValue + 'static>(
        mut self,
        wire: &'static str,
        opts: Opts,
        get: fn(&T) -> &Vec<V>,
        get_mut: fn(&mut T) -> &mut Vec<V>,
    ) -> Self {
        self.bindings.push(Binding {
            name: wire,
            omit_empty: opts.omit_empty,
            quote: opts.quote,
            attribute: false,
            aggregate: true,
            embedded: false,
            rule: Rule::Tag {
                decode: Box::new(move |t: &mut T, tag: &Tag| {
                    let mut v = V::default();
                    v.decode_tag(tag);
                    get_mut(t).push(v);
                }),
                encode: Box::new(move |t: &T, out: &mut Vec<Tag>| {
                    for v in get(t) {
                        let mut tag = Tag::new(wire);
                        v.encode_tag(&mut tag);
                        out.push(tag);
                    }
                }),
                zero: Box::new(move |t: &T| get(t).is_empty()),
            },
        });
        self
    }

    /// Promote the bindings of an optional substructure into this type.
    /// The substructure is allocated when one of its tags is decoded.
    pub fn embed<C: Shaped>(
        mut self,
        _wire: &'static str,
        opts: Opts,
        get: fn(&T) -> &Option<C>,
        get_mut: fn(&mut T) -> &mut Option<C>,
    ) -> Self {
        for child in C::shape().bindings() {
            let rule = Rule::Tag {
                decode: Box::new(move |t: &mut T, tag: &Tag| {
                    child.decode(get_mut(t).get_or_insert_with(C::default), tag)
                }),
                encode: Box::new(move |t: &T, out: &mut Vec<Tag>| {
                    if let Some(c) = get(t) {
                        child.encode(c, out);
                    }
                }),
                zero: Box::new(move |t: &T| get(t).as_ref().map_or(true, |c| child.is_zero(c))),
            };
            self.bindings.push(Binding {
                name: child.name,
                omit_empty: child.omit_empty || opts.omit_empty,
                quote: child.quote,
                attribute: child.attribute,
                aggregate: child.aggregate,
                embedded: true,
                rule,
            });
        }
        self
    }

    /// The catch-all extension map.
    pub fn extra(
        mut self,
        wire: &'static str,
        opts: Opts,
        get: fn(&T) -> &Extensions,
        get_mut: fn(&mut T) -> &mut Extensions,
    ) -> Self {
        self.bindings.push(Binding {
            name: wire,
            omit_empty: opts.omit_empty,
            quote: opts.quote,
            attribute: false,
            aggregate: false,
            embedded: false,
            rule: Rule::Extra {
                sink: Box::new(get_mut),
                view: Box::new(get),
            },
        });
        self
    }

    pub fn build(self) -> Shape<T> {
        let mut index = HashMap::new();
        let mut sink = None;
        for (i, b) in self.bindings.iter().enumerate() {
            match b.rule {
                Rule::Extra { .. } => sink = sink.or(Some(i)),
                _ => {
                    index.entry(b.name).or_insert(i);
                }
            }
        }
        Shape {
            bindings: self.bindings,
            index,
            sink,
        }
    }
}

/// A type with a binding table.
pub trait Shaped: Default + 'static {
    fn shape() -> &'static Shape<Self>;
}

/// Declare the binding table of a struct.
///
/// ```ignore
/// shape! {
///     Key {
///         attr method = "METHOD" [noquote];
///         attr uri = "URI" [omit_empty];
///     }
/// }
/// ```
///
/// Each line names the builder method (`attr`, `tag`, `each`, `embed`,
/// `extra`), the field, its wire name and optional `Opts` modifiers. The
/// table is built on first use behind a `OnceLock`.
macro_rules! shape {
    ($ty:ident { $($kind:ident $field:tt = $wire:literal $([$($opt:ident),* $(,)?])?;)* }) => {
        impl $crate::codec::Shaped for $ty {
            fn shape() -> &'static $crate::codec::Shape<Self> {
                static SHAPE: ::std::sync::OnceLock<$crate::codec::Shape<$ty>> =
                    ::std::sync::OnceLock::new();
                SHAPE.get_or_init(|| {
                    $crate::codec::Shape::<$ty>::builder()
                        $(.$kind(
                            $wire,
                            $crate::codec::Opts::new()$($(.$opt())*)?,
                            |v| &v.$field,
                            |v| &mut v.$field,
                        ))*
                        .build()
                })
            }
        }
    };
}

pub(crate) use shape;
