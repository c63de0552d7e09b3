//! 分类筛选菜单。
//!
//! 选中状态完全由父级传入的逗号分隔 ID 串推导，每次点击都重新生成整串。

use std::collections::HashSet;

use super::types::Category;

/// 某个顶级分类下的选中项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Child(i64),
}

impl Selection {
    fn from_id(id: i64) -> Self {
        if id == 0 {
            Selection::All
        } else {
            Selection::Child(id)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    categories: Vec<Category>,
}

impl CategoryFilter {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// 按分类顺序给出每个顶级分类的选中项
    pub fn selections(&self, joined_ids: &str) -> Vec<(i64, Selection)> {
        let selected = parse_ids(joined_ids);
        self.categories
            .iter()
            .map(|category| {
                let child = category
                    .unique_children()
                    .into_iter()
                    .find(|child| selected.contains(&child.id))
                    .map(|child| Selection::Child(child.id))
                    .unwrap_or(Selection::All);
                (category.id, child)
            })
            .collect()
    }

    pub fn selection_for(&self, joined_ids: &str, parent_id: i64) -> Selection {
        self.selections(joined_ids)
            .into_iter()
            .find(|(id, _)| *id == parent_id)
            .map(|(_, selection)| selection)
            .unwrap_or(Selection::All)
    }

    /// 点击 `parent_id` 下的 `child_id`（0 表示“全部”），返回新的 ID 串。
    /// 不属于该父分类的子 ID 会被忽略。
    pub fn click(&self, joined_ids: &str, parent_id: i64, child_id: i64) -> String {
        let mut selections = self.selections(joined_ids);
        let clicked = Selection::from_id(child_id);

        for (id, selection) in selections.iter_mut() {
            if *id != parent_id {
                continue;
            }
            let known = match clicked {
                Selection::All => true,
                Selection::Child(child) => self
                    .categories
                    .iter()
                    .filter(|c| c.id == parent_id)
                    .any(|c| c.son_category.iter().any(|s| s.id == child)),
            };
            if known {
                *selection = clicked;
            }
        }

        join_ids(&selections)
    }
}

fn parse_ids(joined_ids: &str) -> HashSet<i64> {
    joined_ids
        .split(',')
        .filter_map(|id| id.trim().parse::<i64>().ok())
        .filter(|id| *id != 0)
        .collect()
}

fn join_ids(selections: &[(i64, Selection)]) -> String {
    let mut seen = HashSet::new();
    selections
        .iter()
        .filter_map(|(_, selection)| match selection {
            Selection::Child(id) if seen.insert(*id) => Some(id.to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// 折叠到若干行后能显示的条目数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCollapse {
    pub visible: usize,
    pub needs_toggle: bool,
}

impl RowCollapse {
    /// 按换行布局模拟：条目依次放入行中，放不下则换行；
    /// 比容器还宽的条目单独占一行。
    pub fn compute(widths: &[f64], container_width: f64, gap: f64, max_rows: usize) -> Self {
        if max_rows == 0 || container_width <= 0.0 {
            return Self {
                visible: 0,
                needs_toggle: !widths.is_empty(),
            };
        }

        let mut rows = 1;
        let mut used = 0.0;
        let mut visible = 0;
        for &width in widths {
            let needed = if used > 0.0 { used + gap + width } else { width };
            if used > 0.0 && needed > container_width {
                rows += 1;
                if rows > max_rows {
                    break;
                }
                used = width;
            } else {
                used = needed;
            }
            visible += 1;
        }

        Self {
            visible,
            needs_toggle: visible < widths.len(),
        }
    }
}
