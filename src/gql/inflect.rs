//! Naming rules turning PostgreSQL identifiers into GraphQL names.

/// Words which already read as singular although they end in `s`.
const SINGULAR_ENDINGS: [&str; 3] = ["ss", "us", "is"];

fn words(ident: &str) -> impl Iterator<Item = &str> {
	ident.split(|c: char| !c.is_ascii_alphanumeric()).filter(|w| !w.is_empty())
}

fn capitalise(word: &str) -> String {
	let mut chars = word.chars();
	match chars.next() {
		Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
		None => String::new(),
	}
}

/// Makes sure a generated name is a valid GraphQL name.
fn valid(name: String) -> String {
	match name.chars().next() {
		None => "_".to_owned(),
		Some(c) if c.is_ascii_digit() => format!("_{name}"),
		Some(_) => name,
	}
}

pub fn pascal_case(ident: &str) -> String {
	valid(words(ident).map(capitalise).collect())
}

pub fn camel_case(ident: &str) -> String {
	let mut out = String::new();
	for (i, word) in words(ident).enumerate() {
		if i == 0 {
			out.push_str(&word[..1].to_ascii_lowercase());
			out.push_str(&word[1..]);
		} else {
			out.push_str(&capitalise(word));
		}
	}
	valid(out)
}

pub fn constant_case(ident: &str) -> String {
	valid(words(ident).map(|w| w.to_ascii_uppercase()).collect::<Vec<_>>().join("_"))
}

pub fn singular(word: &str) -> String {
	if let Some(stem) = word.strip_suffix("ies") {
		return format!("{stem}y");
	}
	if SINGULAR_ENDINGS.iter().any(|e| word.ends_with(e)) {
		return word.to_owned();
	}
	match word.strip_suffix('s') {
		Some(stem) if !stem.is_empty() => stem.to_owned(),
		_ => word.to_owned(),
	}
}

pub fn plural(word: &str) -> String {
	let lower = word.to_ascii_lowercase();
	if ["s", "x", "z", "ch", "sh"].iter().any(|e| lower.ends_with(e)) {
		return format!("{word}es");
	}
	if let Some(stem) = word.strip_suffix('y') {
		if !stem.ends_with(['a', 'e', 'i', 'o', 'u', 'A', 'E', 'I', 'O', 'U']) {
			return format!("{stem}ies");
		}
	}
	format!("{word}s")
}

/// The object type name of a relation, e.g. `node_attributes` becomes `NodeAttribute`.
pub fn type_name(relation: &str) -> String {
	pascal_case(&singular(relation))
}

/// The root query field listing a relation, e.g. `node_attributes` becomes `allNodeAttributes`.
pub fn all_rows_field(relation: &str) -> String {
	format!("all{}", plural(&type_name(relation)))
}

pub fn connection_type(relation: &str) -> String {
	format!("{}Connection", plural(&type_name(relation)))
}

pub fn condition_type(relation: &str) -> String {
	format!("{}Condition", type_name(relation))
}

pub fn order_by_type(relation: &str) -> String {
	format!("{}OrderBy", plural(&type_name(relation)))
}

pub fn column_field(column: &str) -> String {
	camel_case(column)
}

pub fn order_by_value(column: &str, ascending: bool) -> String {
	let direction = if ascending {
		"ASC"
	} else {
		"DESC"
	};
	format!("{}_{direction}", constant_case(column))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cases() {
		assert_eq!(pascal_case("media_object"), "MediaObject");
		assert_eq!(camel_case("mime_type"), "mimeType");
		assert_eq!(camel_case("orderpos"), "orderpos");
		assert_eq!(constant_case("mime_type"), "MIME_TYPE");
		assert_eq!(pascal_case("3d_model"), "_3dModel");
		assert_eq!(camel_case("weird-name here"), "weirdNameHere");
	}

	#[test]
	fn singular_and_plural() {
		assert_eq!(singular("nodes"), "node");
		assert_eq!(singular("categories"), "category");
		assert_eq!(singular("status"), "status");
		assert_eq!(singular("analysis"), "analysis");
		assert_eq!(singular("access"), "access");
		assert_eq!(singular("node"), "node");
		assert_eq!(plural("Node"), "Nodes");
		assert_eq!(plural("Category"), "Categories");
		assert_eq!(plural("Status"), "Statuses");
		assert_eq!(plural("Day"), "Days");
		assert_eq!(plural("Box"), "Boxes");
	}

	#[test]
	fn relation_names() {
		assert_eq!(type_name("node_attributes"), "NodeAttribute");
		assert_eq!(all_rows_field("node_attributes"), "allNodeAttributes");
		assert_eq!(all_rows_field("document"), "allDocuments");
		assert_eq!(connection_type("document"), "DocumentsConnection");
		assert_eq!(condition_type("documents"), "DocumentCondition");
		assert_eq!(order_by_type("documents"), "DocumentsOrderBy");
		assert_eq!(order_by_value("orderpos", false), "ORDERPOS_DESC");
	}
}
