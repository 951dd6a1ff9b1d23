//! Source rendering for the fixed-arity struct types.
//!
//! Uses `std` only: `build.rs` compiles this file directly to emit the
//! crate's own `Struct0..Struct12`, and the generator writes the same text
//! to disk for other projects.

/// Number of struct types the crate ships: `Struct0` up to `Struct12`.
pub const MAX_STRUCT_ARITY: usize = 13;

/// Path of the `Struct` trait as seen from inside this crate.
pub const CRATE_TRAIT_PATH: &str = "crate::structs::Struct";

/// Path of the `Struct` trait as seen from a dependent crate.
pub const EXTERN_TRAIT_PATH: &str = "immutable_collections::structs::Struct";

pub const GENERATED_MARKER: &str = "// @generated by immutable-collections. Do not edit.";

const DERIVES: &str = "#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, \
                       ::serde::Serialize, ::serde::Deserialize)]";

pub fn struct_name(arity: usize) -> String {
    format!("Struct{}", arity)
}

pub fn file_name(arity: usize) -> String {
    format!("struct{}.rs", arity)
}

fn joined(arity: usize, f: impl Fn(usize) -> String) -> String {
    (0..arity).map(f).collect::<Vec<_>>().join(", ")
}

/// `(T0, T1)`; a one-element tuple keeps its trailing comma.
fn tuple(arity: usize, f: impl Fn(usize) -> String) -> String {
    if arity == 1 {
        format!("({},)", f(0))
    } else {
        format!("({})", joined(arity, f))
    }
}

/// Render `Struct{arity}` with its constructor, accessors, tuple
/// conversions and `Struct` impl.
pub fn render_struct(arity: usize, trait_path: &str) -> String {
    let lines = if arity == 0 {
        unit_struct_lines(trait_path)
    } else {
        tuple_struct_lines(arity, trait_path)
    };
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn unit_struct_lines(trait_path: &str) -> Vec<String> {
    let name = struct_name(0);
    vec![
        "/// Record with no fields.".to_string(),
        DERIVES.to_string(),
        format!("pub struct {name};"),
        String::new(),
        format!("impl {name} {{"),
        "    pub fn new() -> Self {".to_string(),
        format!("        {name}"),
        "    }".to_string(),
        "}".to_string(),
        String::new(),
        format!("impl From<()> for {name} {{"),
        "    fn from(_: ()) -> Self {".to_string(),
        format!("        {name}"),
        "    }".to_string(),
        "}".to_string(),
        String::new(),
        format!("impl From<{name}> for () {{"),
        format!("    fn from(_: {name}) -> Self {{}}"),
        "}".to_string(),
        String::new(),
        format!("impl {trait_path} for {name} {{"),
        "    fn arity(&self) -> usize {".to_string(),
        "        0".to_string(),
        "    }".to_string(),
        String::new(),
        "    fn get(&self, _: usize) -> Option<&dyn ::std::any::Any> {".to_string(),
        "        None".to_string(),
        "    }".to_string(),
        "}".to_string(),
    ]
}

fn tuple_struct_lines(arity: usize, trait_path: &str) -> Vec<String> {
    let name = struct_name(arity);
    let generics = joined(arity, |i| format!("T{i}"));
    let fields = joined(arity, |i| format!("pub T{i}"));
    let tuple_ty = tuple(arity, |i| format!("T{i}"));
    let params = joined(arity, |i| format!("t{i}: T{i}"));
    let args = joined(arity, |i| format!("t{i}"));
    let static_bounds = joined(arity, |i| format!("T{i}: 'static"));
    let plural = if arity == 1 { "" } else { "s" };

    let mut lines = vec![
        format!("/// Immutable record of {arity} field{plural}."),
        DERIVES.to_string(),
        format!("pub struct {name}<{generics}>({fields});"),
        String::new(),
        format!("impl<{generics}> {name}<{generics}> {{"),
        format!("    pub fn new({params}) -> Self {{"),
        format!("        {name}({args})"),
        "    }".to_string(),
    ];
    for i in 0..arity {
        lines.push(String::new());
        lines.push(format!("    pub fn get{i}(&self) -> &T{i} {{"));
        lines.push(format!("        &self.{i}"));
        lines.push("    }".to_string());
    }
    lines.push("}".to_string());
    lines.push(String::new());

    lines.push(format!("impl<{generics}> From<{tuple_ty}> for {name}<{generics}> {{"));
    lines.push(format!("    fn from(t: {tuple_ty}) -> Self {{"));
    lines.push(format!("        {name}({})", joined(arity, |i| format!("t.{i}"))));
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push(String::new());

    lines.push(format!("impl<{generics}> From<{name}<{generics}>> for {tuple_ty} {{"));
    lines.push(format!("    fn from(s: {name}<{generics}>) -> Self {{"));
    lines.push(format!("        {}", tuple(arity, |i| format!("s.{i}"))));
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push(String::new());

    lines.push(format!("impl<{static_bounds}> {trait_path} for {name}<{generics}> {{"));
    lines.push("    fn arity(&self) -> usize {".to_string());
    lines.push(format!("        {arity}"));
    lines.push("    }".to_string());
    lines.push(String::new());
    lines.push("    fn get(&self, i: usize) -> Option<&dyn ::std::any::Any> {".to_string());
    lines.push("        match i {".to_string());
    for i in 0..arity {
        lines.push(format!("            {i} => Some(&self.{i} as &dyn ::std::any::Any),"));
    }
    lines.push("            _ => None,".to_string());
    lines.push("        }".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines
}

/// Every struct below `max_arity` in one source file, for `include!`.
pub fn render_all(max_arity: usize, trait_path: &str) -> String {
    let mut out = format!("{GENERATED_MARKER}\n");
    for arity in 0..max_arity {
        out.push('\n');
        out.push_str(&render_struct(arity, trait_path));
    }
    out
}

/// `mod.rs` declaring one module per generated struct file.
pub fn render_module(max_arity: usize) -> String {
    let mut lines = vec![GENERATED_MARKER.to_string(), String::new()];
    lines.extend((0..max_arity).map(|arity| format!("mod struct{arity};")));
    lines.push(String::new());
    lines.extend(
        (0..max_arity).map(|arity| format!("pub use struct{arity}::{};", struct_name(arity))),
    );
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
