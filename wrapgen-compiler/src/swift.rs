//! Swift backend
//!
//! Each entity becomes a `final class` around an `OpaquePointer`. The native
//! destructor runs from `deinit`, which Swift calls exactly once per
//! initialized instance and never for an `init?` that returned `nil`.

use std::slice;

use wrapgen_checker::{Marshalling, MemberSummary, Ownership, StringBridge, TargetLanguage};
use wrapgen_model::{Entity, Visibility};

use crate::backend::{EmitContext, EmitError, Emitter, SourceText};
use crate::ir::{
    IRBuilder, IRFunction, IRInitializer, IRParameter, IRProperty, IRReturn, IRSetter, IRWrapper,
};
use crate::utils::{render_banner, sanitize_identifier, CodeWriter};

const TARGET: TargetLanguage = TargetLanguage::Swift;

#[derive(Debug, Clone, Default)]
pub struct SwiftEmitter;

impl SwiftEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Emitter for SwiftEmitter {
    fn target(&self) -> TargetLanguage {
        TARGET
    }

    fn emit(&self, entity: &Entity, ctx: &EmitContext<'_>) -> Result<SourceText, EmitError> {
        let ir = IRBuilder::new(TARGET, ctx).build(entity)?;
        let mut renderer = SwiftRenderer::new(&ir, ctx.bridge);
        renderer.w.raw(&render_banner(ctx.banner, &ir.name, TARGET));
        renderer.render_class()?;
        tracing::trace!(entity = %ir.name, "rendered swift wrapper");
        Ok(renderer.finish())
    }
}

struct SwiftRenderer<'a> {
    ir: &'a IRWrapper,
    bridge: Option<&'a StringBridge>,
    w: CodeWriter,
    summary: MemberSummary,
    access: &'static str,
}

impl<'a> SwiftRenderer<'a> {
    fn new(ir: &'a IRWrapper, bridge: Option<&'a StringBridge>) -> Self {
        Self {
            ir,
            bridge,
            w: CodeWriter::new("    "),
            summary: MemberSummary::default(),
            access: match ir.visibility {
                Visibility::Public => "public ",
                Visibility::Internal => "",
            },
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

    fn render_class(&mut self) -> Result<(), EmitError> {
        let ir = self.ir;
        let access = self.access;

        self.w.line("import Foundation")?;
        self.w.blank()?;
        self.w.open(format_args!("{access}final class {} {{", ir.name))?;
        self.w.line(format_args!("{access}let rawValue: OpaquePointer"))?;
        if ir.retains_owner {
            self.w.line("private let owner: AnyObject?")?;
        }
        self.w.blank()?;
        self.render_raw_initializers()?;

        for initializer in &ir.initializers {
            self.w.blank()?;
            self.render_initializer(initializer)?;
        }

        self.w.blank()?;
        self.render_deinit()?;

        for function in &ir.functions {
            self.w.blank()?;
            self.render_function(function)?;
        }
        for property in &ir.properties {
            self.w.blank()?;
            self.render_property(property)?;
        }

        self.w.close("}")?;
        Ok(())
    }

    /// Adopting initializer, plus the owner-retaining one for borrowed views
    fn render_raw_initializers(&mut self) -> Result<(), EmitError> {
        let retains_owner = self.ir.retains_owner;

        self.w
            .open(format_args!("{}init(rawValue: OpaquePointer) {{", self.access))?;
        self.w.line("self.rawValue = rawValue")?;
        if retains_owner {
            self.w.line("self.owner = nil")?;
        }
        self.w.close("}")?;

        if retains_owner {
            self.w.blank()?;
            self.w.open("init(rawValue: OpaquePointer, owner: AnyObject) {")?;
            self.w.line("self.rawValue = rawValue")?;
            self.w.line("self.owner = owner")?;
            self.w.close("}")?;
        }
        Ok(())
    }

    fn render_initializer(&mut self, initializer: &IRInitializer) -> Result<(), EmitError> {
        let failable = if initializer.fallible { "?" } else { "" };
        self.w.open(format_args!(
            "{}init{failable}({}) {{",
            self.access,
            declarations(&initializer.parameters)
        ))?;
        self.render_bridging(&initializer.parameters)?;

        let call = format!(
            "{}({})",
            initializer.native,
            arguments(None, &initializer.parameters)
        );
        if initializer.fallible {
            self.w.open(format_args!("guard let result = {call} else {{"))?;
            self.w.line("return nil")?;
            self.w.close("}")?;
        } else {
            self.w.line(format_args!("let result = {call}"))?;
        }
        self.w.blank()?;
        self.w.line("self.rawValue = result")?;
        if self.ir.retains_owner {
            self.w.line("self.owner = nil")?;
        }
        self.w.close("}")?;

        self.summary.initializers += 1;
        Ok(())
    }

    fn render_deinit(&mut self) -> Result<(), EmitError> {
        let ir = self.ir;
        let destructor = &ir.destructor;
        self.w.open("deinit {")?;
        if ir.retains_owner {
            self.w.open("if owner == nil {")?;
            self.w.line(format_args!("{destructor}(self.rawValue)"))?;
            self.w.close("}")?;
        } else {
            self.w.line(format_args!("{destructor}(self.rawValue)"))?;
        }
        self.w.close("}")?;

        self.summary.finalizers += 1;
        Ok(())
    }

    fn render_function(&mut self, function: &IRFunction) -> Result<(), EmitError> {
        let modifier = if function.is_static { "static " } else { "" };
        let returns = if function.returns.is_void() {
            String::new()
        } else {
            format!(" -> {}", function.returns.ty.host)
        };
        self.w.open(format_args!(
            "{}{modifier}func {}({}){returns} {{",
            self.access,
            sanitize_identifier(&function.name, TARGET),
            declarations(&function.parameters)
        ))?;

        let receiver = if function.is_static {
            None
        } else {
            self.w.line("let obj = self.rawValue")?;
            Some("obj")
        };
        self.render_bridging(&function.parameters)?;

        let call = format!(
            "{}({})",
            function.native,
            arguments(receiver, &function.parameters)
        );
        self.render_result(&call, &function.returns)?;
        self.w.close("}")?;

        self.summary.functions += 1;
        Ok(())
    }

    fn render_property(&mut self, property: &IRProperty) -> Result<(), EmitError> {
        self.w.open(format_args!(
            "{}var {}: {} {{",
            self.access,
            sanitize_identifier(&property.name, TARGET),
            property.returns.ty.host
        ))?;

        match &property.setter {
            Some(setter) => {
                self.w.open("get {")?;
                self.render_getter(property)?;
                self.w.close("}")?;
                self.w.open("set {")?;
                self.render_setter(setter)?;
                self.w.close("}")?;
                self.summary.setters += 1;
            }
            None => self.render_getter(property)?,
        }
        self.w.close("}")?;

        self.summary.accessors += 1;
        Ok(())
    }

    fn render_getter(&mut self, property: &IRProperty) -> Result<(), EmitError> {
        self.w.line("let obj = self.rawValue")?;
        self.render_result(&format!("{}(obj)", property.getter), &property.returns)
    }

    fn render_setter(&mut self, setter: &IRSetter) -> Result<(), EmitError> {
        let value = IRParameter {
            name: "newValue".to_string(),
            ty: setter.ty.clone(),
        };
        self.w.line("let obj = self.rawValue")?;
        self.render_bridging(slice::from_ref(&value))?;
        self.w.line(format_args!(
            "{}({})",
            setter.native,
            arguments(Some("obj"), slice::from_ref(&value))
        ))?;
        Ok(())
    }

    /// Native strings for string parameters, each released by a `defer` so
    /// every exit path frees them
    fn render_bridging(&mut self, parameters: &[IRParameter]) -> Result<(), EmitError> {
        let mut bridged = false;
        for param in parameters.iter().filter(|p| p.is_bridged()) {
            let bridge = self.bridge()?;
            let name = sanitize_identifier(&param.name, TARGET);
            if param.ty.nullable {
                self.w
                    .line(format_args!("let {name} = {name}.map {{ {}($0) }}", bridge.create))?;
                self.w.open("defer {")?;
                self.w.open(format_args!("if let {name} = {name} {{"))?;
                self.w.line(format_args!("{}({name})", bridge.release))?;
                self.w.close("}")?;
                self.w.close("}")?;
            } else {
                self.w
                    .line(format_args!("let {name} = {}({name})", bridge.create))?;
                self.w.open("defer {")?;
                self.w.line(format_args!("{}({name})", bridge.release))?;
                self.w.close("}")?;
            }
            bridged = true;
        }
        if bridged {
            self.w.blank()?;
        }
        Ok(())
    }

    fn render_result(&mut self, call: &str, returns: &IRReturn) -> Result<(), EmitError> {
        if returns.is_void() {
            self.w.line(call)?;
            return Ok(());
        }

        if returns.ty.nullable {
            self.w.open(format_args!("guard let result = {call} else {{"))?;
            self.w.line("return nil")?;
            self.w.close("}")?;
        } else {
            self.w.line(format_args!("let result = {call}"))?;
        }

        match returns.ty.marshalling {
            Marshalling::StringBridge => {
                let bridge = self.bridge()?;
                self.w.open("defer {")?;
                self.w.line(format_args!("{}(result)", bridge.release))?;
                self.w.close("}")?;
                self.w.line(format_args!("return {}(result)", bridge.to_host))?;
            }
            Marshalling::HandleWrap => {
                let entity = returns.entity().unwrap_or(&returns.ty.host);
                match returns.ownership {
                    Ownership::Borrowed => self
                        .w
                        .line(format_args!("return {entity}(rawValue: result, owner: self)"))?,
                    Ownership::Owned | Ownership::NotApplicable => self
                        .w
                        .line(format_args!("return {entity}(rawValue: result)"))?,
                }
            }
            Marshalling::PassThrough | Marshalling::HandleUnwrap => {
                self.w.line("return result")?;
            }
        }
        Ok(())
    }
}

fn declarations(parameters: &[IRParameter]) -> String {
    parameters
        .iter()
        .map(|p| format!("{}: {}", sanitize_identifier(&p.name, TARGET), p.ty.host))
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
                (Marshalling::HandleUnwrap, true) => format!("{name}?.rawValue"),
                (Marshalling::HandleUnwrap, false) => format!("{name}.rawValue"),
                _ => name,
            }
        }))
        .collect::<Vec<_>>()
        .join(", ")
}
