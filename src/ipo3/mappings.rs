//! Chinese label to field name dictionaries
//!
//! Field names match the camelCase serde names of the records in
//! [`crate::types::stock`], so a translated row deserializes straight into
//! its record type.

use crate::html::{normalize_value, Row};
use serde::de::DeserializeOwned;
use tracing::warn;

pub type KeyMapping = &'static [(&'static str, &'static str)];

pub const COMPANY_INFO: KeyMapping = &[
    ("股票名称", "stockName"),
    ("股票代码", "stockCode"),
    ("最新价", "lastPrice"),
    ("涨跌额", "changeValue"),
    ("涨跌幅", "changeRate"),
    ("所属行业", "industry"),
    ("今开", "openPrice"),
    ("最高", "highPrice"),
    ("平均价", "averagePrice"),
    ("市盈率", "peRatio"),
    ("成交量", "volume"),
    ("总市值", "totalMarketValue"),
    ("昨收", "prevClosePrice"),
    ("最低", "lowPrice"),
    ("换手率", "turnoverRate"),
    ("市净率", "pbRatio"),
    ("成交额", "turnover"),
    ("流通市值", "circularMarketValue"),
    ("公司名称", "companyName"),
    ("公司网址", "companyWebsite"),
    ("公司电话", "companyPhone"),
    ("董秘", "companySecretary"),
    ("董秘Email", "companySecretaryEmail"),
    ("董秘电话", "companySecretaryPhone"),
    ("法人", "legalRepresentative"),
    ("主办券商", "broker"),
    ("交易方式", "transactionMethod"),
    ("挂牌日期", "listingDate"),
    ("成立日期", "establishDate"),
    ("做市日期", "makingDate"),
    ("注册资本", "registeredCapital"),
    ("所属地区", "area"),
    ("办公地址", "companyAddress"),
    ("公司简介", "companyIntroduction"),
    ("主营业务", "mainBusiness"),
    ("经营范围", "businessScope"),
    ("融资状态", "financingStatus"),
    ("实际募资净额", "financingActualNetAmount"),
    ("融资成功率", "financingSuccessRate"),
    ("融资排名", "financingRanking"),
];

pub const EQUITY_STRUCTURE: KeyMapping = &[
    ("总股本", "totalEquity"),
    ("流通股本", "circulatingEquity"),
    ("统计日期", "statisticalDate"),
    ("股东户数", "shareholderCount"),
];

pub const SHAREHOLDERS: KeyMapping = &[
    ("股东名称", "shareholderName"),
    ("持股数", "shareholdings"),
    ("持股比例", "shareholdingRatio"),
];

pub const SENIOR_MANAGEMENT: KeyMapping = &[
    ("姓名", "name"),
    ("职位", "position"),
    ("最高学历", "highestEducation"),
    ("任期开始日期", "termStartDate"),
    ("简介", "introduction"),
];

pub const NEWS_META: KeyMapping = &[("来源", "source"), ("时间", "time")];

pub const INVESTORS: KeyMapping = &[
    ("投资者", "investor"),
    ("类型", "investorType"),
    ("是否为公司高管", "isCompanyExecutive"),
    ("持股数", "numberOfSharesHeld"),
    ("投资额（元）", "investmentAmount"),
    ("锁定状态", "lockedState"),
];

pub const FUND_BOARD: KeyMapping = &[
    ("募集资金", "fundMoney"),
    ("增发数量", "additionalIssuanceQuantity"),
    ("增发价格", "additionalIssuancePrice"),
];

pub const TRADES: KeyMapping = &[
    ("交易日期", "tradeDate"),
    ("总成交额（元）", "totalTradeAmount"),
    ("成交价格（元）", "tradePrice"),
    ("成交数量（股）", "tradeQuantity"),
    ("买方账号名称", "buyerName"),
    ("买方主办券商", "buyerBroker"),
    ("卖方账号名称", "sellerName"),
    ("卖方主办券商", "sellerBroker"),
];

pub const SURVEY: KeyMapping = &[
    ("融资进度", "financingProgress"),
    ("融资金额", "financingMoney"),
    ("出让股份", "transferOfShares"),
    ("每股价格", "pricePerShare"),
    ("最新公告日", "latestAnnouncementDate"),
    ("预案公告日", "planAnnouncementDate"),
    ("董秘", "companySecretary"),
    ("董秘电话", "companySecretaryPhone"),
    ("董秘邮箱", "companySecretaryEmail"),
    ("行业分类", "industry"),
    ("主办券商", "broker"),
    ("增发对象", "additionalIssuanceTarget"),
    ("增发目的", "purposeOfIssuance"),
];

pub const BROKERS: KeyMapping = &[
    ("做市商", "broker"),
    ("初始库存", "initialStock"),
    ("初始价格", "initialPrice"),
];

pub const INCOME_STATEMENT: KeyMapping = &[
    ("报告期", "reportDate"),
    ("营业总收入", "totalSalesRevenue"),
    ("营业收入", "salesRevenue"),
    ("营业总成本", "totalSalesCost"),
    ("营业成本", "salesCost"),
    ("营业税金及附加", "additionalTax"),
    ("销售费用", "sellingExpenses"),
    ("管理费用", "managementExpenses"),
    ("财务费用", "financialExpenses"),
    ("营业利润", "salesProfit"),
    ("利润总额", "totalProfit"),
    ("净利润", "netProfit"),
    ("公告日期", "publishDate"),
];

pub const BALANCE_SHEET: KeyMapping = &[
    ("报告期", "reportDate"),
    ("货币资金", "cashAndBank"),
    ("应收票据", "notesReceivable"),
    ("应收账款", "accountsReceivable"),
    ("存货", "inventory"),
    ("流动资产合计", "totalCurrentAssets"),
    ("固定资产", "fixedAsset"),
    ("无形资产", "intangibleAsset"),
    ("资产总计", "totalAssets"),
    ("流动负债合计", "totalCurrentLiabilities"),
    ("负债合计", "totalLiabilities"),
    ("股东权益合计", "totalEquity"),
    ("公告日期", "publishDate"),
];

pub const CASH_FLOW_STATEMENT: KeyMapping = &[
    ("报告期", "reportDate"),
    ("销售商品、提供劳务收到的现金", "cashFromGoodsAndServices"),
    ("经营活动产生的现金流量净额", "netCashFromOperatingActivities"),
    ("投资活动产生的现金流量净额", "netCashFromInvestingActivities"),
    ("现金及现金等价物净增加额", "netIncreaseInCash"),
    ("期初现金及现金等价物余额", "openingBalance"),
    ("期末现金及现金等价物余额", "closingBalance"),
    ("净利润", "netProfit"),
    ("公告日期", "publishDate"),
];

pub const FINANCIAL_ANALYSIS: KeyMapping = &[
    ("报告期", "reportDate"),
    ("每股收益-基本", "earningsPerShareOfBase"),
    ("每股净资产", "netAssetValuePerShare"),
    ("净资产收益率-摊薄", "returnOnEquityDiluted"),
    ("总资产报酬率", "totalAssetReturnRate"),
    ("销售净利率", "salesNetProfitMargin"),
    ("销售毛利率", "salesGrossProfitMargin"),
    ("资产负债率", "assetLiabilityRatio"),
    ("流动比率", "currentRatio"),
    ("速动比率", "quickRatio"),
    ("存货周转率", "inventoryTurnover"),
    ("总资产周转率", "totalAssetTurnoverRate"),
];

/// Field name for `label`, if the dictionary knows it
pub fn translate(mapping: KeyMapping, label: &str) -> Option<&'static str> {
    mapping
        .iter()
        .find(|(chinese, _)| *chinese == label)
        .map(|(_, english)| *english)
}

/// Rename every key the dictionary knows; unknown keys pass through.
pub fn convert_keys(mapping: KeyMapping, row: &Row) -> Row {
    row.iter()
        .map(|(key, value)| {
            let key = translate(mapping, key).map_or_else(|| key.clone(), str::to_string);
            (key, value.clone())
        })
        .collect()
}

/// [`convert_keys`] plus [`normalize_value`] on every value
pub fn normalize_row(mapping: KeyMapping, row: &Row) -> Row {
    convert_keys(mapping, row)
        .into_iter()
        .map(|(key, value)| (key, normalize_value(&value)))
        .collect()
}

/// Deserialize a translated row into its record type.
///
/// Extraction never fails, so neither does this: a row that does not fit
/// yields the default record.
pub fn into_record<T>(row: Row) -> T
where
    T: DeserializeOwned + Default,
{
    let object = row
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect::<serde_json::Map<_, _>>();

    match serde_json::from_value(serde_json::Value::Object(object)) {
        Ok(record) => record,
        Err(e) => {
            warn!(
                "Row does not fit {}: {}",
                std::any::type_name::<T>(),
                e
            );
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BrokerInfo, IncomeStatement, SurveyInfo};

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_mapping_is_identity() {
        let input = row(&[("foo", "bar")]);
        assert_eq!(convert_keys(&[], &input), input);
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let converted = convert_keys(BROKERS, &row(&[("做市商", "某证券"), ("备注", "x")]));
        assert_eq!(converted, row(&[("broker", "某证券"), ("备注", "x")]));
    }

    #[test]
    fn test_dictionaries_have_unique_labels() {
        for mapping in [
            COMPANY_INFO,
            EQUITY_STRUCTURE,
            SHAREHOLDERS,
            SENIOR_MANAGEMENT,
            INVESTORS,
            TRADES,
            SURVEY,
            INCOME_STATEMENT,
            BALANCE_SHEET,
            CASH_FLOW_STATEMENT,
            FINANCIAL_ANALYSIS,
        ] {
            let mut labels: Vec<_> = mapping.iter().map(|(c, _)| *c).collect();
            labels.sort_unstable();
            labels.dedup();
            assert_eq!(labels.len(), mapping.len());
        }
    }

    #[test]
    fn test_normalize_row() {
        let normalized = normalize_row(
            BROKERS,
            &row(&[("做市商", " 某 证券 "), ("初始库存", "1,200,000"), ("初始价格", "-")]),
        );
        assert_eq!(normalized["broker"], "某 证券");
        assert_eq!(normalized["initialStock"], "1200000");
        assert_eq!(normalized["initialPrice"], "");
    }

    #[test]
    fn test_into_record_keeps_unknown_in_other() {
        let survey: SurveyInfo = into_record(normalize_row(
            SURVEY,
            &row(&[("融资进度", "董事会预案"), ("发行方式", "定向")]),
        ));
        assert_eq!(survey.financing_progress, "董事会预案");
        assert_eq!(survey.other["发行方式"], "定向");
    }

    #[test]
    fn test_into_record_optional_fields() {
        let income: IncomeStatement = into_record(normalize_row(
            INCOME_STATEMENT,
            &row(&[("报告期", "2023-12-31"), ("净利润", "1,000")]),
        ));
        assert_eq!(income.report_date.as_deref(), Some("2023-12-31"));
        assert_eq!(income.net_profit.as_deref(), Some("1000"));
        assert_eq!(income.sales_cost, None);
    }

    #[test]
    fn test_into_record_drops_unmapped_on_closed_records() {
        let broker: BrokerInfo = into_record(row(&[("broker", "A"), ("extra", "ignored")]));
        assert_eq!(broker.broker, "A");
        assert_eq!(broker.initial_stock, "");
    }
}
