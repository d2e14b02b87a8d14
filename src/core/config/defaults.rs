use std::collections::BTreeMap;

use crate::style::ColumnGuide;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

pub fn default_org_whitelist() -> Vec<String> {
    strings(&[
        "国家烟草专卖局",
        "中国烟草总公司",
        "国家发展改革委",
        "国家统计局",
        "财政部",
        "商务部",
        "市场监管总局",
        "新华社",
        "东方烟草报社",
    ])
}

pub fn default_org_patterns() -> Vec<String> {
    strings(&[r"[\p{Han}A-Za-z0-9]{2,20}(?:烟草专卖局|烟草局|烟草总公司|烟草公司)"])
}

pub fn default_system_prompt() -> String {
    "你是《东方烟草报》的资深编辑，擅长学习范例风格并改写行业稿件。严格按照示例学习风格特征，生成符合目标栏目要求的高质量稿件。".to_string()
}

pub fn default_tone() -> String {
    "专业、客观、准确，语言自然流畅".to_string()
}

pub fn default_negative_phrases() -> Vec<String> {
    strings(&[
        "高度重视",
        "取得了显著成效",
        "取得了良好效果",
        "进一步加强",
        "不断提升",
        "全力以赴",
        "震撼",
        "惊人",
        "给力",
        "超赞",
    ])
}

pub fn default_positive_alternatives() -> Vec<String> {
    strings(&[
        "用数据说话",
        "以具体举措回应",
        "同比增长",
        "结构持续优化",
        "稳中有进",
    ])
}

pub fn default_financial_terms() -> Vec<String> {
    strings(&[
        "同比",
        "环比",
        "营收",
        "销售收入",
        "利润",
        "税利",
        "增长",
        "结构优化",
        "投资",
        "效益",
        "市场",
        "数字化",
    ])
}

pub fn default_discourse_cues() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (
            "background".to_string(),
            strings(&["近年来", "今年以来", "面对", "为了", "随着", "背景"]),
        ),
        (
            "action".to_string(),
            strings(&["推进", "实施", "开展", "部署", "建设", "推出", "开发"]),
        ),
        (
            "result".to_string(),
            strings(&["实现", "提升", "增长", "达到", "完成", "成效", "下降"]),
        ),
    ])
}

pub fn default_columns() -> BTreeMap<String, ColumnGuide> {
    BTreeMap::from([
        (
            "news_general".to_string(),
            ColumnGuide {
                label: "要闻".to_string(),
                aliases: strings(&["要闻", "新闻", "news"]),
                guidance: strings(&[
                    "标题：主体+动作/成果，官方庄重，不使用感叹号",
                    "导语：时间+地点+主体+行动+结果",
                    "正文：背景→举措→成效→展望，逻辑清晰",
                    "语言：使用“召开、部署、推进、落实、协同”等正式表达",
                ]),
                keywords: strings(&["会议", "召开", "举办", "活动", "部署", "启动"]),
            },
        ),
        (
            "economic_data".to_string(),
            ColumnGuide {
                label: "经济运行".to_string(),
                aliases: strings(&["经济运行", "经济", "数据", "economy"]),
                guidance: strings(&[
                    "标题：数字前置突出亮点，如“45.2万箱：某地卷烟销售创新高”",
                    "导语：核心数据开篇，包含同比变化",
                    "正文：数据概览→结构分析→效益评估→后续目标",
                    "语言：重视“同比增长、销售收入、结构优化”等专业术语",
                ]),
                keywords: strings(&["增长", "销售", "收入", "同比", "数据", "%", "亿元"]),
            },
        ),
        (
            "policy_interpretation".to_string(),
            ColumnGuide {
                label: "政策解读".to_string(),
                aliases: strings(&["政策解读", "政策", "policy"]),
                guidance: strings(&[
                    "标题：政策要点+执行路径，权威严谨",
                    "导语：政策背景+核心内容+执行要求",
                    "正文：政策解读→执行机制→预期效果→保障措施",
                    "语言：强调“贯彻落实、统筹推进、机制建设”等权威表达",
                ]),
                keywords: strings(&["政策", "通知", "公告", "规定", "办法", "意见"]),
            },
        ),
        (
            "case_observation".to_string(),
            ColumnGuide {
                label: "案例".to_string(),
                aliases: strings(&["案例", "典型", "case"]),
                guidance: strings(&[
                    "标题：典型做法/成果导向，突出示范性",
                    "导语：典型场景+创新做法+示范效果",
                    "正文：问题背景→创新实践→成效亮点→经验价值",
                    "语言：突出“典型经验、创新实践、示范引领、复制推广”",
                ]),
                keywords: strings(&["典型", "先进", "案例", "经验", "创新", "示范"]),
            },
        ),
    ])
}
