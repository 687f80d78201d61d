use crate::state::AppState;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 重置密码表单
///
/// 不落库：校验通过即视为重置成功。
#[derive(Debug, Default, Deserialize)]
pub struct ResetForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub verification_code: String,
}

#[derive(Serialize)]
struct FieldView<'a> {
    name: &'static str,
    input_type: &'static str,
    placeholder: &'static str,
    value: &'a str,
    error: Option<&'static str>,
}

/// 校验表单，返回 字段名 -> 错误提示
pub fn validate_reset(form: &ResetForm) -> BTreeMap<&'static str, &'static str> {
    let mut errors = BTreeMap::new();

    if form.username.trim().is_empty() {
        errors.insert("username", "请输入用户名");
    }
    if form.password.is_empty() {
        errors.insert("password", "请输入密码");
    }
    if form.confirm_password.is_empty() {
        errors.insert("confirm_password", "请输入确认密码");
    } else if form.password != form.confirm_password {
        errors.insert("confirm_password", "密码和确认密码不一致");
    }
    if form.phone_number.is_empty() {
        errors.insert("phone_number", "请输入手机号码");
    } else if !is_valid_phone(&form.phone_number) {
        errors.insert("phone_number", "请输入正确的手机号码");
    }
    if form.verification_code.trim().is_empty() {
        errors.insert("verification_code", "请输入验证码");
    }

    errors
}

/// 11 位数字
fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 11 && phone.bytes().all(|b| b.is_ascii_digit())
}

pub async fn forgot_page(State(state): State<AppState>) -> Response {
    render(&state, &ResetForm::default(), &BTreeMap::new(), false)
}

pub async fn forgot_submit(State(state): State<AppState>, Form(form): Form<ResetForm>) -> Response {
    let errors = validate_reset(&form);
    let success = errors.is_empty();
    if success {
        tracing::info!("用户 {} 提交了密码重置", form.username.trim());
    }
    // 成功后不回显已填写的内容
    let shown = if success { ResetForm::default() } else { form };
    render(&state, &shown, &errors, success)
}

fn render(
    state: &AppState,
    form: &ResetForm,
    errors: &BTreeMap<&'static str, &'static str>,
    success: bool,
) -> Response {
    let field = |name: &'static str, input_type: &'static str, placeholder: &'static str, value| {
        FieldView {
            name,
            input_type,
            placeholder,
            value,
            error: errors.get(name).copied(),
        }
    };
    // 密码类字段不回显
    let fields = vec![
        field("username", "text", "请输入用户名", form.username.as_str()),
        field("password", "password", "请输入新密码", ""),
        field("confirm_password", "password", "请再次输入新密码", ""),
        field("phone_number", "text", "请输入手机号码", form.phone_number.as_str()),
        field("verification_code", "text", "请输入验证码", form.verification_code.as_str()),
    ];

    let ctx = minijinja::context! {
        site_title => &state.config.site.title,
        fields => fields,
        success => success,
    };
    match crate::admin::template::render_admin(&state.admin_env, "forgot_password.html", ctx) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("渲染重置密码页失败：{e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "页面渲染失败").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ResetForm {
        ResetForm {
            username: "admin".into(),
            password: "new-pass".into(),
            confirm_password: "new-pass".into(),
            phone_number: "13800138000".into(),
            verification_code: "1234".into(),
        }
    }

    #[test]
    fn complete_form_passes() {
        assert!(validate_reset(&filled()).is_empty());
    }

    #[test]
    fn empty_form_reports_every_field() {
        let errors = validate_reset(&ResetForm::default());
        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            ["confirm_password", "password", "phone_number", "username", "verification_code"]
        );
    }

    #[test]
    fn mismatched_confirmation() {
        let form = ResetForm {
            confirm_password: "other".into(),
            ..filled()
        };
        assert_eq!(
            validate_reset(&form).get("confirm_password"),
            Some(&"密码和确认密码不一致")
        );
    }

    #[test]
    fn phone_must_be_eleven_digits() {
        for bad in ["1380013800", "138001380001", "1380013800a"] {
            let form = ResetForm {
                phone_number: bad.into(),
                ..filled()
            };
            assert_eq!(
                validate_reset(&form).get("phone_number"),
                Some(&"请输入正确的手机号码"),
                "{bad}"
            );
        }
    }
}
