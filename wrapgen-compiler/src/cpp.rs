//! C++ backend
//!
//! Emits one header per entity. The wrapper holds a `std::shared_ptr` whose
//! deleter is the native destructor; `adopt` is the only place that deleter is
//! attached, so release happens exactly once. Borrowed views use the aliasing
//! constructor, sharing the owner's control block and never calling the
//! destructor on their own pointer. Native strings live in `std::unique_ptr`
//! guards for the duration of the call.
//!
//! Headers of entities that name each other include each other. Each header
//! forward-declares its dependencies, declares the class, and only then
//! includes the dependency headers and defines the members `inline`, so either
//! header can be included first.

use std::collections::BTreeSet;
use std::slice;

use wrapgen_checker::{Marshalling, MemberSummary, Ownership, StringBridge, TargetLanguage};
use wrapgen_model::{capitalize, Entity};

use crate::backend::{EmitContext, EmitError, Emitter, SourceText};
use crate::ir::{
    IRBuilder, IRFunction, IRInitializer, IRParameter, IRProperty, IRReturn, IRSetter, IRWrapper,
};
use crate::utils::{render_banner, sanitize_identifier, CodeWriter};

const TARGET: TargetLanguage = TargetLanguage::Cpp;

const DEFAULT_NAMESPACE: &str = "wrapgen";
const DEFAULT_NATIVE_HEADER: &str = "{entity}.h";

#[derive(Debug, Clone)]
pub struct CppEmitter {
    namespace: String,
    /// `{entity}` is replaced by the entity name
    native_header: String,
}

impl Default for CppEmitter {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            native_header: DEFAULT_NATIVE_HEADER.to_string(),
        }
    }
}

impl CppEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_native_header(mut self, header: impl Into<String>) -> Self {
        self.native_header = header.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Emitter for CppEmitter {
    fn target(&self) -> TargetLanguage {
        TARGET
    }

    fn emit(&self, entity: &Entity, ctx: &EmitContext<'_>) -> Result<SourceText, EmitError> {
        let ir = IRBuilder::new(TARGET, ctx).build(entity)?;
        let mut renderer = CppRenderer::new(&ir, ctx.bridge, &self.namespace);
        renderer.w.raw(&render_banner(ctx.banner, &ir.name, TARGET));
        renderer.render_preamble(&self.native_header.replace("{entity}", &ir.name))?;

        renderer.open_namespace()?;
        renderer.render_forward_declarations()?;
        renderer.render_class()?;
        if ir.dependencies.is_empty() {
            renderer.w.blank()?;
        } else {
            renderer.close_namespace()?;
            renderer.w.blank()?;
            renderer.render_dependency_includes()?;
            renderer.open_namespace()?;
        }
        renderer.render_definitions()?;
        renderer.close_namespace()?;

        tracing::trace!(entity = %ir.name, "rendered c++ wrapper");
        Ok(renderer.finish())
    }
}

struct CppRenderer<'a> {
    ir: &'a IRWrapper,
    bridge: Option<&'a StringBridge>,
    namespace: &'a str,
    w: CodeWriter,
    summary: MemberSummary,
}

impl<'a> CppRenderer<'a> {
    fn new(ir: &'a IRWrapper, bridge: Option<&'a StringBridge>, namespace: &'a str) -> Self {
        Self {
            ir,
            bridge,
            namespace,
            w: CodeWriter::new("    "),
            summary: MemberSummary::default(),
        }
    }

    fn finish(self) -> SourceText {
        SourceText {
            text: self.w.finish(),
            summary: self.summary,
        }
    }

    fn bridge(&self) -> Result<&'a StringBridge, EmitError> {
        self.bridge.ok_or(EmitError::MissingBridge { target: TARGET })
    }

    fn render_preamble(&mut self, native_header: &str) -> Result<(), EmitError> {
        let ir = self.ir;
        self.w.line("#pragma once")?;
        self.w.blank()?;

        let mut includes: BTreeSet<&str> = ["cstdint", "memory", "stdexcept"].into_iter().collect();
        let parameters = ir
            .initializers
            .iter()
            .flat_map(|i| i.parameters.iter())
            .chain(ir.functions.iter().flat_map(|f| f.parameters.iter()))
            .map(|p| &p.ty);
        let returns = ir
            .functions
            .iter()
            .map(|f| &f.returns.ty)
            .chain(ir.properties.iter().map(|p| &p.returns.ty));
        let setters = ir.properties.iter().filter_map(|p| p.setter.as_ref()).map(|s| &s.ty);
        for ty in parameters.chain(returns).chain(setters) {
            if ty.nullable {
                includes.insert("optional");
            }
            if ty.marshalling == Marshalling::StringBridge {
                includes.insert("string");
            }
        }
        if ir.retains_owner {
            includes.insert("utility");
        }
        for include in includes {
            self.w.line(format_args!("#include <{include}>"))?;
        }
        self.w.blank()?;

        self.w.line(format_args!("#include \"{native_header}\""))?;
        self.w.blank()?;
        Ok(())
    }

    fn open_namespace(&mut self) -> Result<(), EmitError> {
        self.w.line(format_args!("namespace {} {{", self.namespace))?;
        self.w.blank()?;
        Ok(())
    }

    fn close_namespace(&mut self) -> Result<(), EmitError> {
        self.w.blank()?;
        self.w
            .line(format_args!("}} // namespace {}", self.namespace))?;
        Ok(())
    }

    fn render_forward_declarations(&mut self) -> Result<(), EmitError> {
        let ir = self.ir;
        if ir.dependencies.is_empty() {
            return Ok(());
        }
        for dependency in &ir.dependencies {
            self.w.line(format_args!("class {dependency};"))?;
        }
        self.w.blank()?;
        Ok(())
    }

    /// Dependency headers come after the class so a header cycle always
    /// finds both classes declared before any member body is parsed
    fn render_dependency_includes(&mut self) -> Result<(), EmitError> {
        let ir = self.ir;
        for dependency in &ir.dependencies {
            self.w.line(format_args!("#include \"{dependency}.hpp\""))?;
        }
        self.w.blank()?;
        Ok(())
    }

    fn access_specifier(&mut self, label: &str) -> Result<(), EmitError> {
        self.w.dedent();
        self.w.line(format_args!("  {label}:"))?;
        self.w.indent();
        Ok(())
    }

    fn render_class(&mut self) -> Result<(), EmitError> {
        let ir = self.ir;
        let name = &ir.name;

        self.w.open(format_args!("class {name} {{"))?;
        self.access_specifier("public")?;
        self.w
            .line(format_args!("explicit {name}(::{name}* rawValue)"))?;
        self.w.line("    : ptr(adopt(rawValue)) {}")?;

        if ir.retains_owner {
            self.w.blank()?;
            self.w.line("template <typename Owner>")?;
            self.w.open(format_args!(
                "static {name} borrowed(const std::shared_ptr<Owner>& owner, ::{name}* rawValue) {{"
            ))?;
            self.w.line(format_args!(
                "return {name}(std::shared_ptr<::{name}>(owner, rawValue));"
            ))?;
            self.w.close("}")?;
        }

        for initializer in &ir.initializers {
            self.w.blank()?;
            let explicit = if initializer.parameters.len() == 1 {
                "explicit "
            } else {
                ""
            };
            self.w.line(format_args!(
                "{explicit}{name}({});",
                declarations(&initializer.parameters)
            ))?;
        }
        for function in &ir.functions {
            self.w.blank()?;
            let modifier = if function.is_static { "static " } else { "" };
            self.w.line(format_args!(
                "{modifier}{} {}({});",
                function.returns.ty.host,
                sanitize_identifier(&function.name, TARGET),
                declarations(&function.parameters)
            ))?;
        }
        for property in &ir.properties {
            self.w.blank()?;
            self.w.line(format_args!(
                "{} {}() const;",
                property.returns.ty.host,
                sanitize_identifier(&property.name, TARGET)
            ))?;
            if let Some(setter) = &property.setter {
                self.w.line(format_args!(
                    "void set{}({});",
                    capitalize(&property.name),
                    declarations(slice::from_ref(&setter_value(setter)))
                ))?;
            }
        }

        self.w.blank()?;
        self.w.open(format_args!("::{name}* rawValue() const {{"))?;
        self.w.line("return ptr.get();")?;
        self.w.close("}")?;
        self.w.blank()?;

        self.access_specifier("private")?;
        if ir.retains_owner {
            self.w
                .line(format_args!("explicit {name}(std::shared_ptr<::{name}> ptr)"))?;
            self.w.line("    : ptr(std::move(ptr)) {}")?;
            self.w.blank()?;
        }
        self.w.open(format_args!(
            "static std::shared_ptr<::{name}> adopt(::{name}* rawValue) {{"
        ))?;
        self.w.line(format_args!(
            "return std::shared_ptr<::{name}>(rawValue, &::{});",
            ir.destructor
        ))?;
        self.w.close("}")?;
        self.summary.finalizers += 1;
        self.w.blank()?;
        self.w.line(format_args!("std::shared_ptr<::{name}> ptr;"))?;
        self.w.close("};")?;
        Ok(())
    }

    fn render_definitions(&mut self) -> Result<(), EmitError> {
        let ir = self.ir;
        let mut first = true;
        for initializer in &ir.initializers {
            self.separate(&mut first)?;
            self.render_constructor(initializer)?;
        }
        for function in &ir.functions {
            self.separate(&mut first)?;
            self.render_function(function)?;
        }
        for property in &ir.properties {
            self.separate(&mut first)?;
            self.render_getter(property)?;
            if let Some(setter) = &property.setter {
                self.separate(&mut first)?;
                self.render_setter(property, setter)?;
            }
        }
        Ok(())
    }

    fn separate(&mut self, first: &mut bool) -> Result<(), EmitError> {
        if !std::mem::take(first) {
            self.w.blank()?;
        }
        Ok(())
    }

    fn render_constructor(&mut self, initializer: &IRInitializer) -> Result<(), EmitError> {
        let name = &self.ir.name;
        self.w.open(format_args!(
            "inline {name}::{name}({}) {{",
            declarations(&initializer.parameters)
        ))?;
        self.render_bridging(&initializer.parameters)?;
        self.w.line(format_args!(
            "auto result = ::{}({});",
            initializer.native,
            arguments(None, &initializer.parameters)
        ))?;
        let failure = if initializer.fallible {
            format!("{} failed", initializer.native)
        } else {
            format!("{} returned null", initializer.native)
        };
        self.render_null_check(&failure)?;
        self.w.line("ptr = adopt(result);")?;
        self.w.close("}")?;

        self.summary.initializers += 1;
        Ok(())
    }

    fn render_function(&mut self, function: &IRFunction) -> Result<(), EmitError> {
        self.w.open(format_args!(
            "inline {} {}::{}({}) {{",
            function.returns.ty.host,
            self.ir.name,
            sanitize_identifier(&function.name, TARGET),
            declarations(&function.parameters)
        ))?;

        let receiver = if function.is_static {
            None
        } else {
            self.w.line("auto obj = ptr.get();")?;
            Some("obj")
        };
        self.render_bridging(&function.parameters)?;
        let call = format!(
            "::{}({})",
            function.native,
            arguments(receiver, &function.parameters)
        );
        self.render_result(&call, &function.native, &function.returns)?;
        self.w.close("}")?;

        self.summary.functions += 1;
        Ok(())
    }

    fn render_getter(&mut self, property: &IRProperty) -> Result<(), EmitError> {
        self.w.open(format_args!(
            "inline {} {}::{}() const {{",
            property.returns.ty.host,
            self.ir.name,
            sanitize_identifier(&property.name, TARGET)
        ))?;
        self.w.line("auto obj = ptr.get();")?;
        self.render_result(
            &format!("::{}(obj)", property.getter),
            &property.getter,
            &property.returns,
        )?;
        self.w.close("}")?;

        self.summary.accessors += 1;
        Ok(())
    }

    fn render_setter(&mut self, property: &IRProperty, setter: &IRSetter) -> Result<(), EmitError> {
        let value = setter_value(setter);
        self.w.open(format_args!(
            "inline void {}::set{}({}) {{",
            self.ir.name,
            capitalize(&property.name),
            declarations(slice::from_ref(&value))
        ))?;
        self.w.line("auto obj = ptr.get();")?;
        self.render_bridging(slice::from_ref(&value))?;
        self.w.line(format_args!(
            "::{}({});",
            setter.native,
            arguments(Some("obj"), slice::from_ref(&value))
        ))?;
        self.w.close("}")?;

        self.summary.setters += 1;
        Ok(())
    }

    /// One RAII guard per string parameter; destroyed on every exit path
    fn render_bridging(&mut self, parameters: &[IRParameter]) -> Result<(), EmitError> {
        for param in parameters.iter().filter(|p| p.is_bridged()) {
            let bridge = self.bridge()?;
            let name = sanitize_identifier(&param.name, TARGET);
            let created = if param.ty.nullable {
                format!("{name} ? {}({name}->c_str()) : nullptr", bridge.create)
            } else {
                format!("{}({name}.c_str())", bridge.create)
            };
            self.w.line(format_args!(
                "auto {} = {}({created}, &{});",
                native_local(&param.name),
                guard_type(bridge),
                bridge.release
            ))?;
        }
        Ok(())
    }

    fn render_null_check(&mut self, message: &str) -> Result<(), EmitError> {
        self.w.open("if (result == nullptr) {")?;
        self.w
            .line(format_args!("throw std::runtime_error(\"{message}\");"))?;
        self.w.close("}")?;
        Ok(())
    }

    fn render_result(&mut self, call: &str, native: &str, returns: &IRReturn) -> Result<(), EmitError> {
        if returns.is_void() {
            self.w.line(format_args!("{call};"))?;
            return Ok(());
        }

        self.w.line(format_args!("auto result = {call};"))?;
        let pointer = matches!(
            returns.ty.marshalling,
            Marshalling::StringBridge | Marshalling::HandleWrap
        );
        if returns.ty.nullable {
            self.w.open("if (result == nullptr) {")?;
            self.w.line("return std::nullopt;")?;
            self.w.close("}")?;
        } else if pointer {
            self.render_null_check(&format!("{native} returned null"))?;
        }

        match returns.ty.marshalling {
            Marshalling::StringBridge => {
                let bridge = self.bridge()?;
                self.w.line(format_args!(
                    "auto resultGuard = {}(result, &{});",
                    guard_type(bridge),
                    bridge.release
                ))?;
                self.w
                    .line(format_args!("return std::string({}(result));", bridge.to_host))?;
            }
            Marshalling::HandleWrap => {
                let entity = returns.entity().unwrap_or(&returns.ty.host);
                match returns.ownership {
                    Ownership::Borrowed => self
                        .w
                        .line(format_args!("return {entity}::borrowed(ptr, result);"))?,
                    Ownership::Owned | Ownership::NotApplicable => {
                        self.w.line(format_args!("return {entity}(result);"))?
                    }
                }
            }
            Marshalling::PassThrough | Marshalling::HandleUnwrap => {
                self.w.line("return result;")?;
            }
        }
        Ok(())
    }
}

/// The setter argument, named `value`
fn setter_value(setter: &IRSetter) -> IRParameter {
    IRParameter {
        name: "value".to_string(),
        ty: setter.ty.clone(),
    }
}

/// `std::unique_ptr` owning a native string through the bridge's release call
fn guard_type(bridge: &StringBridge) -> String {
    let element = bridge.native_type.trim_end_matches(|c: char| c == '*' || c.is_whitespace());
    format!(
        "std::unique_ptr<{element}, decltype(&{})>",
        bridge.release
    )
}

fn native_local(name: &str) -> String {
    format!("{name}Native")
}

fn declarations(parameters: &[IRParameter]) -> String {
    parameters
        .iter()
        .map(|p| {
            let name = sanitize_identifier(&p.name, TARGET);
            match p.ty.marshalling {
                Marshalling::StringBridge | Marshalling::HandleUnwrap => {
                    format!("const {}& {name}", p.ty.host)
                }
                Marshalling::PassThrough | Marshalling::HandleWrap => {
                    format!("{} {name}", p.ty.host)
                }
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn arguments(receiver: Option<&str>, parameters: &[IRParameter]) -> String {
    receiver
        .map(str::to_string)
        .into_iter()
        .chain(parameters.iter().map(|p| {
            let name = sanitize_identifier(&p.name, TARGET);
            match (p.ty.marshalling, p.ty.nullable) {
                (Marshalling::StringBridge, _) => format!("{}.get()", native_local(&p.name)),
                (Marshalling::HandleUnwrap, true) => {
                    format!("({name} ? {name}->rawValue() : nullptr)")
                }
                (Marshalling::HandleUnwrap, false) => format!("{name}.rawValue()"),
                _ => name,
            }
        }))
        .collect::<Vec<_>>()
        .join(", ")
}
