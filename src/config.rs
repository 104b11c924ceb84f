//! Container options.
//!
//! Options are explicit values threaded into the container at build time;
//! there is no process-wide default configuration.

use std::collections::HashMap;

use crate::types::TypeDef;

/// Member binding behaviour applied when constructing instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberBinding {
    /// Never bind declared members.
    #[default]
    None,
    /// Bind every declared member; unresolved required members fail.
    All,
    /// Bind every declared member, tolerating unresolved contracts.
    IfAvailable,
}

#[derive(Debug, Clone, Copy, Default)]
struct Toggles {
    array_injection: Option<bool>,
    list_injection: Option<bool>,
    collection_injection: Option<bool>,
    auto_func_injection: Option<bool>,
    auto_lazy_injection: Option<bool>,
    member_binding: Option<MemberBinding>,
}

/// Options consulted during compilation.
///
/// Collection shapes (`Array<T>`, `List<T>`, `Enumerable<T>`) auto-compose by
/// default; automatic `Func<T>`/`Lazy<T>` injection is opt-in. Every option
/// can be overridden per element or target definition.
///
/// # Examples
///
/// ```
/// use crucible_di::{ContainerOptions, MemberBinding};
///
/// let options = ContainerOptions::new()
///     .auto_func_injection(true)
///     .member_binding(MemberBinding::All);
/// assert!(options.auto_func_injection_for(None));
/// ```
#[derive(Debug, Clone)]
pub struct ContainerOptions {
    array_injection: bool,
    list_injection: bool,
    collection_injection: bool,
    auto_func_injection: bool,
    auto_lazy_injection: bool,
    member_binding: MemberBinding,
    per_def: HashMap<TypeDef, Toggles>,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        ContainerOptions {
            array_injection: true,
            list_injection: true,
            collection_injection: true,
            auto_func_injection: false,
            auto_lazy_injection: false,
            member_binding: MemberBinding::None,
            per_def: HashMap::new(),
        }
    }
}

impl ContainerOptions {
    /// Options with default toggles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables `Array<T>` auto-composition globally.
    pub fn array_injection(mut self, enabled: bool) -> Self {
        self.array_injection = enabled;
        self
    }

    /// Enables or disables `List<T>` auto-composition globally.
    pub fn list_injection(mut self, enabled: bool) -> Self {
        self.list_injection = enabled;
        self
    }

    /// Enables or disables `Enumerable<T>` auto-composition globally.
    pub fn collection_injection(mut self, enabled: bool) -> Self {
        self.collection_injection = enabled;
        self
    }

    /// Enables or disables automatic `Func<T>` injection globally.
    pub fn auto_func_injection(mut self, enabled: bool) -> Self {
        self.auto_func_injection = enabled;
        self
    }

    /// Enables or disables automatic `Lazy<T>` injection globally.
    pub fn auto_lazy_injection(mut self, enabled: bool) -> Self {
        self.auto_lazy_injection = enabled;
        self
    }

    /// Sets the global member binding behaviour.
    pub fn member_binding(mut self, behaviour: MemberBinding) -> Self {
        self.member_binding = behaviour;
        self
    }

    /// Overrides one toggle for a specific definition. The definition is the
    /// element type for collection shapes and the constructed type for member
    /// binding.
    pub fn override_for(mut self, def: &TypeDef, configure: impl FnOnce(DefOptions) -> DefOptions) -> Self {
        let toggles = self.per_def.entry(def.clone()).or_default();
        let updated = configure(DefOptions(*toggles)).0;
        *toggles = updated;
        self
    }

    fn toggles(&self, def: Option<&TypeDef>) -> Option<&Toggles> {
        def.and_then(|d| self.per_def.get(d))
    }

    /// Effective `Array<T>` toggle for an element definition.
    pub fn array_injection_for(&self, element: Option<&TypeDef>) -> bool {
        self.toggles(element)
            .and_then(|t| t.array_injection)
            .unwrap_or(self.array_injection)
    }

    /// Effective `List<T>` toggle for an element definition.
    pub fn list_injection_for(&self, element: Option<&TypeDef>) -> bool {
        self.toggles(element)
            .and_then(|t| t.list_injection)
            .unwrap_or(self.list_injection)
    }

    /// Effective `Enumerable<T>` toggle for an element definition.
    pub fn collection_injection_for(&self, element: Option<&TypeDef>) -> bool {
        self.toggles(element)
            .and_then(|t| t.collection_injection)
            .unwrap_or(self.collection_injection)
    }

    /// Effective `Func<T>` toggle for an inner definition.
    pub fn auto_func_injection_for(&self, inner: Option<&TypeDef>) -> bool {
        self.toggles(inner)
            .and_then(|t| t.auto_func_injection)
            .unwrap_or(self.auto_func_injection)
    }

    /// Effective `Lazy<T>` toggle for an inner definition.
    pub fn auto_lazy_injection_for(&self, inner: Option<&TypeDef>) -> bool {
        self.toggles(inner)
            .and_then(|t| t.auto_lazy_injection)
            .unwrap_or(self.auto_lazy_injection)
    }

    /// Effective member binding behaviour for a constructed definition.
    pub fn member_binding_for(&self, constructed: Option<&TypeDef>) -> MemberBinding {
        self.toggles(constructed)
            .and_then(|t| t.member_binding)
            .unwrap_or(self.member_binding)
    }
}

/// Per-definition option overrides, applied through
/// [`ContainerOptions::override_for`].
pub struct DefOptions(Toggles);

impl DefOptions {
    /// Overrides `Array<T>` auto-composition for this definition.
    pub fn array_injection(mut self, enabled: bool) -> Self {
        self.0.array_injection = Some(enabled);
        self
    }

    /// Overrides `List<T>` auto-composition for this definition.
    pub fn list_injection(mut self, enabled: bool) -> Self {
        self.0.list_injection = Some(enabled);
        self
    }

    /// Overrides `Enumerable<T>` auto-composition for this definition.
    pub fn collection_injection(mut self, enabled: bool) -> Self {
        self.0.collection_injection = Some(enabled);
        self
    }

    /// Overrides automatic `Func<T>` injection for this definition.
    pub fn auto_func_injection(mut self, enabled: bool) -> Self {
        self.0.auto_func_injection = Some(enabled);
        self
    }

    /// Overrides automatic `Lazy<T>` injection for this definition.
    pub fn auto_lazy_injection(mut self, enabled: bool) -> Self {
        self.0.auto_lazy_injection = Some(enabled);
        self
    }

    /// Overrides member binding behaviour for this definition.
    pub fn member_binding(mut self, behaviour: MemberBinding) -> Self {
        self.0.member_binding = Some(behaviour);
        self
    }
}
