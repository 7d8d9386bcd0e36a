//! 讲课监控站点的元素定位与脚本
//!
//! 站点结构变化时只需要改这里。

use crate::infrastructure::Locator;

/// 每页固定显示的行数
pub const MAX_ROWS_PER_PAGE: usize = 10;

/// 完成度为满时列表显示的文本
pub const COMPLETE_TEXT: &str = "100.00%";

/// 详情页保存成功的提示文本
pub const SAVED_MESSAGE: &str = "Data has been saved";

/// 按文本查找页面可见元素时的范围
const VISIBLE: &str = "body *";

// ========== 登录 / 角色 ==========

pub fn login_button() -> Locator {
    Locator::text(VISIBLE, "LOGIN")
}

pub fn email_input() -> Locator {
    Locator::css(r#"input[type="email"], input[name="loginfmt"]"#)
}

pub fn password_input() -> Locator {
    Locator::css(r#"input[type="password"], input[name="passwd"]"#)
}

pub fn next_button() -> Locator {
    Locator::any_of(vec![
        Locator::css(r#"input[type="submit"]"#),
        Locator::text("button", "Next"),
    ])
}

pub fn sign_in_button() -> Locator {
    Locator::any_of(vec![
        Locator::css(r#"input[type="submit"]"#),
        Locator::text("button", "Sign in"),
    ])
}

pub fn stay_signed_in_button() -> Locator {
    Locator::css(r#"#idSIButton9, input[value="Yes"]"#)
}

pub fn role_label() -> Locator {
    Locator::text(VISIBLE, "Login As")
}

pub fn role_select() -> Locator {
    Locator::css("select")
}

// ========== 筛选 ==========

pub fn filter_label() -> Locator {
    Locator::text(VISIBLE, "TERM")
}

pub fn any_select() -> Locator {
    Locator::css("select")
}

pub fn term_select() -> Locator {
    Locator::text(VISIBLE, "TERM").parent().within("select")
}

pub fn campus_select() -> Locator {
    Locator::text(VISIBLE, "CAMPUS").parent().within("select")
}

pub fn search_button() -> Locator {
    Locator::css(r#"#btnSearch, input[value="Search"]"#)
}

// ========== 列表 ==========

pub fn listing_rows() -> Locator {
    Locator::css("table tbody tr")
}

/// 列表主体，用于判断翻页后内容是否变化
pub fn listing_body() -> Locator {
    Locator::css("table tbody")
}

/// 第 `index` 行的最后一列（完成度）
pub fn completion_cell(index: usize) -> Locator {
    listing_rows().nth(index).within("td").last()
}

/// 第 `index` 行的 "Monitoring Log" 链接
pub fn monitoring_log_link(index: usize) -> Locator {
    listing_rows()
        .nth(index)
        .within("a")
        .has_text("Monitoring Log")
}

pub fn next_page_link() -> Locator {
    Locator::any_of(vec![
        Locator::text("a", "›"),
        Locator::text("a", "Next"),
        Locator::css(".pagination .next"),
    ])
}

// ========== 详情页 ==========

pub fn save_button() -> Locator {
    Locator::css("#btnSave")
}

pub fn saved_message() -> Locator {
    Locator::text(VISIBLE, SAVED_MESSAGE)
}

pub fn confirm_button() -> Locator {
    Locator::any_of(vec![
        Locator::css(r#"input[value="Ok"]"#),
        Locator::text("button", "OK"),
    ])
}

/// 勾选全部监控项、填写全部备注并点击保存
///
/// 保存按钮不存在时不做任何修改，保证要么全部生效要么都不生效。
pub fn remediation_script(placeholder: &str) -> String {
    format!(
        r#"
        (() => {{
            const save = document.querySelector('#btnSave');
            if (!save) {{
                return {{ saved: false, toggles: 0, fields: 0 }};
            }}
            const toggles = document.querySelectorAll('input[type="checkbox"].isMonitoring');
            toggles.forEach(cb => cb.checked = true);
            const fields = document.querySelectorAll(
                '.CourseLogMessageToLecturer, .CourseLogNotesToLecturer, .AttendanceMessageToLecturer, .AttendanceNotesToLecturer'
            );
            fields.forEach(f => f.value = {placeholder});
            save.click();
            return {{ saved: true, toggles: toggles.length, fields: fields.length }};
        }})()
        "#,
        placeholder = crate::infrastructure::js_str(placeholder)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remediation_script_checks_save_button_first() {
        let script = remediation_script("ok");
        let guard = script.find("if (!save)").unwrap();
        let first_write = script.find("cb.checked = true").unwrap();
        assert!(guard < first_write);
        assert!(script.contains(r#"f.value = "ok""#));
    }

    #[test]
    fn test_completion_cell_targets_last_column_of_row() {
        let locator = completion_cell(4);
        assert_eq!(locator.to_string(), "table tbody tr >> nth=4 td >> last");
    }

    #[test]
    fn test_text_labels_are_scoped_to_body() {
        assert_eq!(filter_label().to_string(), "body *:has-text(\"TERM\")");
        assert!(login_button().to_js().contains("querySelectorAll(\"body *\")"));
    }

    #[test]
    fn test_monitoring_log_link_is_scoped_to_row() {
        let js = monitoring_log_link(2).to_js();
        assert!(js.contains(".slice(2, 3)"));
        assert!(js.contains("\"Monitoring Log\""));
    }
}
