/*!

This is the long-form manual for `poverty_chart` and `rebatechart`.

## Input formats

The data file holds precomputed statistics: nothing is computed by this
program, values are only selected and displayed.

The following formats are supported:
* `csv` Comma Separated Values with a header row
* `xlsx` Excel spreadsheet, the first row being the header

Every row describes one year and one age group. The columns `year` and
`age_group` are mandatory. A year written as `2025.0` is read as `2025`.
The age group must be one of `0-17`, `18-64`, `65+` or `Overall`.

All the other columns are numbers. Empty cells are allowed and are treated as
missing values.

### Column schema

Each scenario has its own reduction column:

| year | age_group | relative_poverty_reduction | relative_poverty_reduction_taxable | relative_poverty_reduction_flat_tax | relative_poverty_reduction_taxable_flat_tax |
|------|-----------|----------------------------|------------------------------------|-------------------------------------|---------------------------------------------|
| 2025 | 0-17      | -0.41                      | -0.37                              | -0.30                               | -0.26                                       |

### Partition schema

A `reform` column tells which scenario the row belongs to. Its values are
`baseline`, `taxable`, `flat_tax` and `taxable_flat_tax`.

| year | age_group | reform  | baseline_poverty_rate | reform_poverty_rate | relative_poverty_reduction |
|------|-----------|---------|-----------------------|---------------------|----------------------------|
| 2025 | 0-17      | taxable | 0.112                 | 0.070               | -0.375                     |

The optional columns `baseline_poverty_rate`, `reform_poverty_rate`,
`rebate_amount` and `tax_rate` are shown when hovering a point, in both
schemas.

The schema is never guessed from the file. It is set with `--schema` or in
the configuration file.

## Scenarios

The two toggles select one of four scenarios:

| `--taxable` | `--flat-tax` | column                                        | reform             |
|-------------|--------------|-----------------------------------------------|--------------------|
| no          | no           | `relative_poverty_reduction`                  | `baseline`         |
| yes         | no           | `relative_poverty_reduction_taxable`          | `taxable`          |
| no          | yes          | `relative_poverty_reduction_flat_tax`         | `flat_tax`         |
| yes         | yes          | `relative_poverty_reduction_taxable_flat_tax` | `taxable_flat_tax` |

If the selected scenario is not in the file, the program stops with an error
naming the missing column or reform, and no chart is written.

## Labels

Each line ends with the name of its age group. When two lines end too close to
each other, the upper label is moved up so that labels are at least `minGap`
apart (0.02 by default, that is 2 percentage points). The lowest label never
moves. Labels are processed from the lowest to the highest, each one being
compared with the position of the previous label after it was moved.

## Configuration

A JSON configuration file can be passed with `--config`. All the fields are
optional, and the command line takes precedence.

```json
{
  "outputSettings": {
    "title": "Oregon Rebate Impact on Poverty by Age Group Over Time",
    "outputDirectory": "out",
    "width": 750,
    "height": 650
  },
  "dataSource": {
    "provider": "csv",
    "filePath": "or_rebate.csv",
    "schema": "columns"
  },
  "chart": {
    "minGap": 0.02,
    "yAxisMin": -0.9,
    "yAxisMax": 0.05
  }
}
```

Relative file paths are resolved from the directory of the configuration file.

*/
