//! Assignment target classification.
//!
//! Decides, from the shape of an assignment's left-hand side alone, whether
//! the assignment writes the browsing context's location. Nothing here ever
//! evaluates an expression: a computed key that is not a literal stays
//! [`PropertyRef::Dynamic`] and never matches, because resolving it would mean
//! running attacker-controlled code.

use oxc_ast::ast::{AssignmentTarget, Expression, TemplateLiteral};

/// The identifier that names the navigation location.
pub const LOCATION: &str = "location";

/// The only location property matched under [`LocationPropertyPolicy::HrefOnly`].
pub const HREF: &str = "href";

/// Identifiers treated as the global navigation object unless configured otherwise.
pub const DEFAULT_NAVIGATION_GLOBALS: &[&str] = &["window"];

/// Which writes through the location object count as navigation.
///
/// Applies to `location.<prop> = ...` and `window.location.<prop> = ...`.
/// Exactly one rule set is active per classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocationPropertyPolicy {
    /// Any property write on the location object matches, including
    /// computed keys that cannot be resolved.
    #[default]
    AnyProperty,
    /// Only writes to `href` (static or string-literal key) match.
    HrefOnly,
}

/// A property reference as it appears in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRef<'s> {
    /// `obj.name`
    Static(&'s str),
    /// `obj["name"]` or ``obj[`name`]``
    Literal(&'s str),
    /// `obj[expr]` for any other expression.
    Dynamic,
}

impl<'s> PropertyRef<'s> {
    /// The property name, if it can be known without evaluation.
    pub fn resolve(&self) -> Option<&'s str> {
        match self {
            Self::Static(name) | Self::Literal(name) => Some(name),
            Self::Dynamic => None,
        }
    }
}

/// The innermost object of a member chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseRef<'s> {
    /// A plain identifier.
    Identifier(&'s str),
    /// `this`
    This,
    /// Anything else (calls, literals, deeper chains).
    Other,
}

impl<'s> BaseRef<'s> {
    fn from_expression(expr: &'s Expression<'_>) -> Self {
        match expr {
            Expression::Identifier(ident) => Self::Identifier(ident.name.as_str()),
            Expression::ThisExpression(_) => Self::This,
            Expression::ParenthesizedExpression(paren) => Self::from_expression(&paren.expression),
            _ => Self::Other,
        }
    }
}

/// The object side of a member-access assignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRef<'s> {
    /// A plain identifier.
    Identifier(&'s str),
    /// `this`
    This,
    /// One nested member access, e.g. the `window.location` in
    /// `window.location.href`.
    Member {
        /// Object of the nested access.
        base: BaseRef<'s>,
        /// Property of the nested access.
        property: PropertyRef<'s>,
    },
    /// Anything else.
    Other,
}

impl<'s> ObjectRef<'s> {
    fn from_expression(expr: &'s Expression<'_>) -> Self {
        match expr {
            Expression::Identifier(ident) => Self::Identifier(ident.name.as_str()),
            Expression::ThisExpression(_) => Self::This,
            Expression::StaticMemberExpression(member) => Self::Member {
                base: BaseRef::from_expression(&member.object),
                property: PropertyRef::Static(member.property.name.as_str()),
            },
            Expression::ComputedMemberExpression(member) => Self::Member {
                base: BaseRef::from_expression(&member.object),
                property: computed_property(&member.expression),
            },
            Expression::ParenthesizedExpression(paren) => Self::from_expression(&paren.expression),
            _ => Self::Other,
        }
    }
}

/// Syntactic description of an assignment's left-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetDescriptor<'s> {
    /// `name = ...`
    Identifier(&'s str),
    /// `object.property = ...` or `object[property] = ...`
    Member {
        /// The accessed object.
        object: ObjectRef<'s>,
        /// The accessed property.
        property: PropertyRef<'s>,
    },
    /// Destructuring patterns, private fields, TypeScript wrappers.
    Other,
}

impl<'s> TargetDescriptor<'s> {
    /// Describe an assignment target without evaluating any part of it.
    pub fn from_target(target: &'s AssignmentTarget<'_>) -> Self {
        match target {
            AssignmentTarget::AssignmentTargetIdentifier(ident) => {
                Self::Identifier(ident.name.as_str())
            }
            AssignmentTarget::StaticMemberExpression(member) => Self::Member {
                object: ObjectRef::from_expression(&member.object),
                property: PropertyRef::Static(member.property.name.as_str()),
            },
            AssignmentTarget::ComputedMemberExpression(member) => Self::Member {
                object: ObjectRef::from_expression(&member.object),
                property: computed_property(&member.expression),
            },
            _ => Self::Other,
        }
    }
}

fn computed_property<'s>(expr: &'s Expression<'_>) -> PropertyRef<'s> {
    match expr {
        Expression::StringLiteral(lit) => PropertyRef::Literal(lit.value.as_str()),
        Expression::TemplateLiteral(tpl) => static_template(tpl)
            .map(PropertyRef::Literal)
            .unwrap_or(PropertyRef::Dynamic),
        Expression::ParenthesizedExpression(paren) => computed_property(&paren.expression),
        _ => PropertyRef::Dynamic,
    }
}

/// Text of a template literal with no substitutions.
fn static_template<'s>(tpl: &'s TemplateLiteral<'_>) -> Option<&'s str> {
    if !tpl.expressions.is_empty() || tpl.quasis.len() != 1 {
        return None;
    }
    tpl.quasis[0].value.cooked.as_ref().map(|cooked| cooked.as_str())
}

/// Decides whether an assignment target is a navigation-location write.
#[derive(Debug, Clone)]
pub struct NavigationClassifier {
    globals: Vec<String>,
    policy: LocationPropertyPolicy,
}

impl Default for NavigationClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_NAVIGATION_GLOBALS.iter().copied(),
            LocationPropertyPolicy::default(),
        )
    }
}

impl NavigationClassifier {
    /// Create a classifier treating `globals` as the global navigation object.
    ///
    /// `this` is always treated as a self-reference and need not be listed.
    pub fn new<I, S>(globals: I, policy: LocationPropertyPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            globals: globals.into_iter().map(Into::into).collect(),
            policy,
        }
    }

    /// The active location property rule set.
    pub fn policy(&self) -> LocationPropertyPolicy {
        self.policy
    }

    /// Classify an assignment target straight from the syntax tree.
    pub fn is_navigation_write(&self, target: &AssignmentTarget<'_>) -> bool {
        self.matches(&TargetDescriptor::from_target(target))
    }

    /// Apply the matching rules to a target description.
    pub fn matches(&self, target: &TargetDescriptor<'_>) -> bool {
        match target {
            // location = ...
            TargetDescriptor::Identifier(name) => *name == LOCATION,
            TargetDescriptor::Member { object, property } => match object {
                // location.href = ..., location[x] = ...
                ObjectRef::Identifier(name) if *name == LOCATION => {
                    self.location_property_matches(property)
                }
                // window.location = ..., window["location"] = ..., this.location = ...
                ObjectRef::Identifier(name) if self.is_navigation_global(name) => {
                    property.resolve() == Some(LOCATION)
                }
                ObjectRef::This => property.resolve() == Some(LOCATION),
                // window.location.href = ..., this["location"].assign = ...
                ObjectRef::Member {
                    base,
                    property: inner,
                } => {
                    self.is_self_reference(base)
                        && inner.resolve() == Some(LOCATION)
                        && self.location_property_matches(property)
                }
                _ => false,
            },
            TargetDescriptor::Other => false,
        }
    }

    fn is_navigation_global(&self, name: &str) -> bool {
        self.globals.iter().any(|g| g == name)
    }

    fn is_self_reference(&self, base: &BaseRef<'_>) -> bool {
        match base {
            BaseRef::This => true,
            BaseRef::Identifier(name) => self.is_navigation_global(name),
            BaseRef::Other => false,
        }
    }

    fn location_property_matches(&self, property: &PropertyRef<'_>) -> bool {
        match self.policy {
            LocationPropertyPolicy::AnyProperty => true,
            LocationPropertyPolicy::HrefOnly => property.resolve() == Some(HREF),
        }
    }
}
